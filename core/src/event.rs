//! Event trait and the wire envelope handed to an event bus.
//!
//! Events describe a submitted change request (or the progress of the task
//! it spawned). They are immutable facts and are encoded as JSON so that
//! downstream consumers in any language can read them.
//!
//! Every event names a partition key. All events for the same change number
//! share that key, which keeps them on one partition and therefore ordered.
//!
//! # Example
//!
//! ```
//! use franc_portal_core::event::{Event, SerializedEvent};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct BranchRequested {
//!     change_number: String,
//! }
//!
//! impl Event for BranchRequested {
//!     fn event_type(&self) -> &'static str {
//!         "branch_requested"
//!     }
//!
//!     fn partition_key(&self) -> &str {
//!         &self.change_number
//!     }
//! }
//!
//! let event = BranchRequested { change_number: "CHG-1".to_string() };
//! let serialized = SerializedEvent::from_event(&event, None).unwrap();
//! assert_eq!(serialized.key, "CHG-1");
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during event encoding and decoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to JSON
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from JSON
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be published to the bus.
pub trait Event: Send + Sync + 'static {
    /// Stable identifier written into the payload and used for routing.
    fn event_type(&self) -> &'static str;

    /// Partition key; events sharing a key are delivered in order.
    fn partition_key(&self) -> &str;

    /// Encode the event as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if serde rejects the value.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        serde_json::to_vec(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Decode an event from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are not a
    /// valid encoding of `Self`.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        serde_json::from_slice(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// An encoded event ready for the bus.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// Event type identifier (e.g. `"device_connection"`)
    pub event_type: String,

    /// Partition key (the change number)
    pub key: String,

    /// JSON payload
    pub data: Vec<u8>,

    /// Optional transport metadata, never part of the payload
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a serialized event from raw parts.
    #[must_use]
    pub const fn new(
        event_type: String,
        key: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            key,
            data,
            metadata,
        }
    }

    /// Encode a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if JSON encoding fails.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            key: event.partition_key().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Parse the payload back into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload is not JSON.
    pub fn payload(&self) -> Result<serde_json::Value, EventError> {
        serde_json::from_slice(&self.data)
            .map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, key: {}, size: {} bytes }}",
            self.event_type,
            self.key,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct PatchRequested {
        change_number: String,
        ports: u8,
    }

    impl Event for PatchRequested {
        fn event_type(&self) -> &'static str {
            "patch_requested"
        }

        fn partition_key(&self) -> &str {
            &self.change_number
        }
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn serialized_event_carries_type_and_key() {
        let event = PatchRequested {
            change_number: "CHG-2024-000001".to_string(),
            ports: 4,
        };

        let serialized =
            SerializedEvent::from_event(&event, None).expect("serialization should succeed");

        assert_eq!(serialized.event_type, "patch_requested");
        assert_eq!(serialized.key, "CHG-2024-000001");
        let payload = serialized.payload().expect("payload is JSON");
        assert_eq!(payload["ports"], 4);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn from_bytes_reads_json() {
        let decoded = PatchRequested::from_bytes(br#"{"change_number":"C","ports":2}"#)
            .expect("valid JSON");
        assert_eq!(decoded.ports, 2);
        assert!(PatchRequested::from_bytes(b"not json").is_err());
    }

    #[test]
    fn serialized_event_display() {
        let serialized = SerializedEvent::new(
            "task_status_update".to_string(),
            "CHG-7".to_string(),
            vec![1, 2, 3, 4, 5],
            None,
        );

        let display = format!("{serialized}");
        assert!(display.contains("task_status_update"));
        assert!(display.contains("CHG-7"));
        assert!(display.contains("5 bytes"));
    }
}
