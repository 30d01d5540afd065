//! Event bus abstraction for handing submitted requests downstream.
//!
//! This module provides the [`EventBus`] trait. The portal publishes one event per
//! accepted change request (plus task progress events) and never consumes anything,
//! so the trait is publish-only.
//!
//! # Flow
//!
//! ```text
//! ┌─────────────┐
//! │   Submit    │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────────┐
//! │    Reducer      │  validation, request snapshot
//! └────────┬────────┘
//!          │ Effect::PublishEvent
//!          ▼
//! ┌─────────────────┐
//! │    Event Bus    │◄─── best effort, bounded timeout
//! └────────┬────────┘
//!          │
//!          ▼
//!   downstream automation
//! ```
//!
//! # Key Principles
//!
//! - **Best effort**: a failed publish never rejects an accepted request
//! - **Keyed by change number**: events for one change stay on one partition
//! - **No automatic retries**: resubmission is a user decision
//!
//! # Topic Naming Convention
//!
//! Topics follow the pattern `{prefix}.{suffix}`, for example
//! `franc.device.connection` or `franc.task.status`.
//!
//! # Implementations
//!
//! - `RedpandaEventBus` / `NoopEventBus` in `franc-portal-redpanda`
//! - `InMemoryEventBus` / `FailingEventBus` in `franc-portal-testing`

use crate::event::SerializedEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to connect to the event bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// The broker did not acknowledge within the configured timeout
    #[error("Publish to topic '{topic}' timed out after {seconds}s")]
    Timeout {
        /// The topic that timed out
        topic: String,
        /// Timeout that elapsed
        seconds: u64,
    },

    /// Topic not found or invalid
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// Invalid client configuration (security protocol, SASL, TLS files)
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Boxed future returned by [`EventBus`] operations.
pub type BusFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + 'a>>;

/// Trait for event bus implementations.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be used as `Arc<dyn EventBus>` inside effects.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic, keyed by [`SerializedEvent::key`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] or [`EventBusError::Timeout`]
    /// if the broker does not accept the event.
    fn publish(&self, topic: &str, event: &SerializedEvent) -> BusFuture<'_>;

    /// Whether publishing reaches a real transport.
    ///
    /// A disabled bus accepts every publish and does nothing with it.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Check that the transport is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if no broker answers.
    fn check_connection(&self) -> BusFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}
