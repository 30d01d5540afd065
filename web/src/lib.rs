//! # FRANC Portal Web
//!
//! Axum HTTP shell over the portal forms.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, sessions
//! │  - Request parsing                      │  ← correlation ids, tracing
//! │  - Response serialization               │  ← help, navigation, metrics
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - PortalReducer per session            │  ← validation, repeat groups
//! │  - Effect descriptions (values)         │  ← lookups, workflow, publish
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at a session handler
//! 2. **Build Action** from path and body
//! 3. **Send** it through the session's `Store`, which runs every effect
//! 4. **Read** the settled state and map it to a response
//!
//! # Example
//!
//! ```ignore
//! use franc_portal_web::{AppState, HelpProvider, router};
//!
//! let state = AppState::new(environment, HelpProvider::new("help"));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8501").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod help;
pub mod middleware;
pub mod navigation;
pub mod router;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use extractors::{ApiJson, ApiPath, CorrelationId};
pub use help::{HelpError, HelpProvider};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};
pub use navigation::Navigation;
pub use router::router;
pub use state::{AppState, PortalStore, SessionError, SessionRegistry};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
