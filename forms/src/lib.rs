//! # FRANC Portal Forms
//!
//! The request forms of the FRANC service portal and the reducer that drives
//! them.
//!
//! - [`validation`]: single-constraint checks and the aggregator
//! - [`interfaces`]: interface rows and vPC groups for device connections
//! - [`options`]: inventory-backed selections with graceful degradation
//! - [`service`]: the three forms and the requests they produce
//! - [`events`]: event payloads and topic naming
//! - [`workflow`]: the DC deployment branch workflow
//! - [`simulator`]: task lifecycle events for accepted requests
//! - [`reducer`]: [`PortalReducer`], one form session per store
//!
//! ## Example
//!
//! ```ignore
//! use franc_portal_forms::{PortalAction, PortalReducer, PortalState, Service};
//! use franc_portal_runtime::Store;
//!
//! let store = Store::new(PortalState::default(), PortalReducer::new(), environment);
//! store.send(PortalAction::OpenService { service: Service::DeviceConnection }).await?;
//! store.send(PortalAction::SetInterfaceCount { count: 2 }).await?;
//! ```

pub mod events;
pub mod interfaces;
pub mod options;
pub mod reducer;
pub mod service;
pub mod simulator;
pub mod validation;
pub mod workflow;

pub use interfaces::{InterfaceEditor, InterfacePlan, InterfaceRole, InterfaceRow, InterfaceSpeed, RowField};
pub use options::{OptionLookup, OptionResolver, SelectField};
pub use reducer::{
    PortalAction, PortalEnvironment, PortalReducer, PortalState, PortalView, SubmissionOutcome,
    SubmissionStatus,
};
pub use service::{FormState, InputError, SelectKey, Service, SubmittedRequest, TextField};
pub use validation::ValidationResult;
