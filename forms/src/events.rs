//! Events published for accepted requests and their simulated tasks.
//!
//! Every payload is a flat JSON object: the common [`EventHeader`] fields
//! followed by the kind-specific ones. All events are keyed by the change
//! number so one change's events stay on one partition.

use crate::interfaces::InterfaceRow;
use chrono::{DateTime, Utc};
use franc_portal_core::event::Event;
use serde::{Deserialize, Serialize};

/// Value of the `source` field on every event.
pub const EVENT_SOURCE: &str = "franc-portal";

/// Default topic prefix.
pub const DEFAULT_TOPIC_PREFIX: &str = "franc";

/// The five event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A device connection request
    DeviceConnection,
    /// A data-center deployment request
    DatacenterDeployment,
    /// A PoP deployment request
    PopDeployment,
    /// Progress of the task spawned by a request
    TaskStatusUpdate,
    /// Final result of that task
    TaskCompletion,
}

impl EventKind {
    /// Value of the `event_type` field
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::DeviceConnection => "device_connection",
            Self::DatacenterDeployment => "datacenter_deployment",
            Self::PopDeployment => "pop_deployment",
            Self::TaskStatusUpdate => "task_status_update",
            Self::TaskCompletion => "task_completion",
        }
    }

    /// Topic suffix appended to the prefix
    #[must_use]
    pub const fn topic_suffix(self) -> &'static str {
        match self {
            Self::DeviceConnection => "device.connection",
            Self::DatacenterDeployment => "datacenter.deployment",
            Self::PopDeployment => "pop.deployment",
            Self::TaskStatusUpdate => "task.status",
            Self::TaskCompletion => "task.completion",
        }
    }

    const fn id_tag(self) -> &'static str {
        match self {
            Self::DeviceConnection => "conn",
            Self::DatacenterDeployment => "dc",
            Self::PopDeployment => "pop",
            Self::TaskStatusUpdate => "status",
            Self::TaskCompletion => "complete",
        }
    }

    const fn request_tag(self) -> &'static str {
        match self {
            Self::DeviceConnection => "device_conn",
            Self::DatacenterDeployment => "datacenter",
            Self::PopDeployment => "pop",
            Self::TaskStatusUpdate => "status_update",
            Self::TaskCompletion => "completion",
        }
    }

    /// `request_id` for a change number, e.g. `device_conn_CHG-1`
    #[must_use]
    pub fn request_id(self, change_number: &str) -> String {
        format!("{}_{change_number}", self.request_tag())
    }
}

/// Topic naming: `{prefix}.{suffix}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}

impl Topics {
    /// Topics under `prefix`
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Full topic name for `kind`
    #[must_use]
    pub fn for_kind(&self, kind: EventKind) -> String {
        format!("{}.{}", self.prefix, kind.topic_suffix())
    }
}

/// Fields shared by every event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// `{tag}_{change_number}_{YYYYmmdd_HHMMSS}`
    pub event_id: String,
    /// See [`EventKind::event_type`]
    pub event_type: String,
    /// Partition key
    pub change_number: String,
    /// See [`EventKind::request_id`]
    pub request_id: String,
    /// When the event was built
    pub timestamp: DateTime<Utc>,
    /// Submitting user, when known
    pub user_id: Option<String>,
    /// Always [`EVENT_SOURCE`]
    pub source: String,
}

impl EventHeader {
    /// Header for a `kind` event about `change_number` at `now`.
    #[must_use]
    pub fn new(
        kind: EventKind,
        change_number: &str,
        now: DateTime<Utc>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            event_id: format!(
                "{}_{change_number}_{}",
                kind.id_tag(),
                now.format("%Y%m%d_%H%M%S")
            ),
            event_type: kind.event_type().to_string(),
            change_number: change_number.to_string(),
            request_id: kind.request_id(change_number),
            timestamp: now,
            user_id,
            source: EVENT_SOURCE.to_string(),
        }
    }
}

/// A device connection request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConnectionEvent {
    /// Common fields
    #[serde(flatten)]
    pub header: EventHeader,
    /// Device name
    pub device_name: String,
    /// Device type label
    pub device_type: String,
    /// Building label
    pub location: String,
    /// `{name, speed, role, vpc_group}` per interface
    pub interfaces: Vec<InterfaceRow>,
    /// Distinct vPC groups in use, `null` when none
    pub vpc_groups: Option<Vec<String>>,
}

/// A data-center deployment request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenterDeploymentEvent {
    /// Common fields
    #[serde(flatten)]
    pub header: EventHeader,
    /// Data center name
    pub dc_name: String,
    /// Metro label
    pub location: String,
    /// Design label
    pub design_pattern: String,
}

/// A PoP deployment request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopDeploymentEvent {
    /// Common fields
    #[serde(flatten)]
    pub header: EventHeader,
    /// PoP name
    pub pop_name: String,
    /// Metro label
    pub location: String,
    /// Design label
    pub design_pattern: String,
    /// Provider label
    pub provider: String,
}

/// Task state carried by status updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Pending,
    /// Running
    InProgress,
    /// Finished successfully
    Completed,
    /// Stopped on an error
    Failed,
}

/// Final task state carried by completion events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Finished successfully
    Completed,
    /// Stopped on an error
    Failed,
    /// Abandoned
    Cancelled,
}

/// Progress of a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdateEvent {
    /// Common fields
    #[serde(flatten)]
    pub header: EventHeader,
    /// Request the task belongs to
    pub original_request_id: String,
    /// Current state
    pub status: TaskStatus,
    /// 0 to 100
    pub progress_percentage: Option<u8>,
    /// Human-readable progress
    pub status_message: Option<String>,
    /// Set when failed
    pub error_details: Option<String>,
    /// Expected finish
    pub estimated_completion: Option<DateTime<Utc>>,
}

/// Final result of a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletionEvent {
    /// Common fields
    #[serde(flatten)]
    pub header: EventHeader,
    /// Request the task belongs to
    pub original_request_id: String,
    /// Final state
    pub completion_status: CompletionStatus,
    /// Summary
    pub completion_message: Option<String>,
    /// Free-form result, e.g. `{steps_completed, execution_time}`
    pub result_data: Option<serde_json::Value>,
    /// Set when failed
    pub error_details: Option<String>,
    /// Seconds
    pub execution_duration: Option<f64>,
}

macro_rules! keyed_by_change_number {
    ($($event:ty => $kind:expr),* $(,)?) => {
        $(
            impl Event for $event {
                fn event_type(&self) -> &'static str {
                    $kind.event_type()
                }

                fn partition_key(&self) -> &str {
                    &self.header.change_number
                }
            }
        )*
    };
}

keyed_by_change_number! {
    DeviceConnectionEvent => EventKind::DeviceConnection,
    DataCenterDeploymentEvent => EventKind::DatacenterDeployment,
    PopDeploymentEvent => EventKind::PopDeployment,
    TaskStatusUpdateEvent => EventKind::TaskStatusUpdate,
    TaskCompletionEvent => EventKind::TaskCompletion,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::interfaces::{InterfaceRole, InterfaceSpeed};
    use franc_portal_core::environment::Clock;
    use franc_portal_core::event::SerializedEvent;
    use franc_portal_testing::test_clock;

    #[test]
    fn header_ids_follow_naming() {
        let header = EventHeader::new(
            EventKind::DatacenterDeployment,
            "CHG-42",
            test_clock().now(),
            None,
        );
        assert_eq!(header.event_id, "dc_CHG-42_20250101_000000");
        assert_eq!(header.request_id, "datacenter_CHG-42");
        assert_eq!(header.event_type, "datacenter_deployment");
        assert_eq!(header.source, "franc-portal");
    }

    #[test]
    fn topics_join_prefix_and_suffix() {
        let topics = Topics::default();
        assert_eq!(topics.for_kind(EventKind::DeviceConnection), "franc.device.connection");
        assert_eq!(
            Topics::new("lab").for_kind(EventKind::TaskCompletion),
            "lab.task.completion"
        );
    }

    #[test]
    fn device_event_is_flat_and_keyed() {
        let event = DeviceConnectionEvent {
            header: EventHeader::new(EventKind::DeviceConnection, "CHG-7", test_clock().now(), None),
            device_name: "NYC-Core-SW01".to_string(),
            device_type: "DCS-7280SR".to_string(),
            location: "AMS-1".to_string(),
            interfaces: vec![InterfaceRow {
                name: "Gi0/1".to_string(),
                speed: InterfaceSpeed::TenGbit,
                role: InterfaceRole::Data,
                vpc_group: None,
            }],
            vpc_groups: None,
        };

        let serialized = SerializedEvent::from_event(&event, None).unwrap();
        assert_eq!(serialized.key, "CHG-7");
        assert_eq!(serialized.event_type, "device_connection");

        let payload = serialized.payload().unwrap();
        assert_eq!(payload["event_id"], "conn_CHG-7_20250101_000000");
        assert_eq!(payload["timestamp"], "2025-01-01T00:00:00Z");
        assert_eq!(payload["user_id"], serde_json::Value::Null);
        assert_eq!(payload["interfaces"][0]["speed"], "10 Gbit");
        assert_eq!(payload["interfaces"][0]["vpc_group"], serde_json::Value::Null);
        assert_eq!(payload["vpc_groups"], serde_json::Value::Null);

        let decoded = DeviceConnectionEvent::from_bytes(&serialized.data).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn task_status_serializes_snake_case() {
        let event = TaskStatusUpdateEvent {
            header: EventHeader::new(EventKind::TaskStatusUpdate, "CHG-7", test_clock().now(), None),
            original_request_id: "pop_CHG-7".to_string(),
            status: TaskStatus::InProgress,
            progress_percentage: Some(25),
            status_message: Some("Executing: Installing edge devices".to_string()),
            error_details: None,
            estimated_completion: None,
        };
        let payload = serde_json::to_value(&event).unwrap();
        assert_eq!(payload["status"], "in_progress");
        assert_eq!(payload["request_id"], "status_update_CHG-7");
        assert_eq!(payload["event_id"], "status_CHG-7_20250101_000000");
    }
}
