//! Simulated execution of an accepted request.
//!
//! Downstream automation is not part of the portal, so after a request is
//! accepted the portal walks a fixed list of steps for it and publishes the
//! task lifecycle: a start status, one status per step, a final status and a
//! completion event. Steps have nominal durations; a time scale turns them
//! into real pauses (zero means no pausing).

use crate::events::{
    CompletionStatus, EventHeader, EventKind, TaskCompletionEvent, TaskStatus,
    TaskStatusUpdateEvent, Topics,
};
use chrono::TimeDelta;
use franc_portal_core::environment::Clock;
use franc_portal_core::event::{Event, SerializedEvent};
use franc_portal_core::event_bus::EventBus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Estimated seconds per remaining step in status updates.
const ESTIMATE_PER_STEP_SECS: i64 = 2;

/// One named step with its nominal duration in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStep {
    /// Shown in status messages
    pub name: String,
    /// Nominal duration, seconds
    pub nominal_secs: f64,
}

impl TaskStep {
    fn new(name: impl Into<String>, nominal_secs: f64) -> Self {
        Self {
            name: name.into(),
            nominal_secs,
        }
    }
}

/// The task a request spawns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    /// e.g. `PoP Deployment: AMS-POP-1`
    pub task_name: String,
    /// Partition key for all task events
    pub change_number: String,
    /// Request the task belongs to
    pub original_request_id: String,
    /// Steps in execution order
    pub steps: Vec<TaskStep>,
}

impl TaskPlan {
    /// Steps for connecting a device with `interface_count` interfaces.
    #[must_use]
    pub fn device_connection(device_name: &str, change_number: &str, interface_count: usize) -> Self {
        Self {
            task_name: format!("Device Connection: {device_name}"),
            change_number: change_number.to_string(),
            original_request_id: EventKind::DeviceConnection.request_id(change_number),
            steps: vec![
                TaskStep::new("Validating device connectivity", 1.5),
                TaskStep::new("Backing up current configuration", 2.0),
                TaskStep::new("Configuring management interface", 1.8),
                TaskStep::new(format!("Configuring {interface_count} data interfaces"), 2.5),
                TaskStep::new("Applying vPC configurations", 2.2),
                TaskStep::new("Verifying connectivity", 1.5),
                TaskStep::new("Running post-deployment tests", 2.0),
            ],
        }
    }

    /// Steps for building a data center with `design_pattern`.
    #[must_use]
    pub fn datacenter_deployment(dc_name: &str, change_number: &str, design_pattern: &str) -> Self {
        Self {
            task_name: format!("Data Center Deployment: {dc_name}"),
            change_number: change_number.to_string(),
            original_request_id: EventKind::DatacenterDeployment.request_id(change_number),
            steps: vec![
                TaskStep::new("Validating deployment parameters", 1.0),
                TaskStep::new("Provisioning spine switches", 3.0),
                TaskStep::new("Provisioning leaf switches", 2.5),
                TaskStep::new("Configuring underlay network", 2.8),
                TaskStep::new("Configuring overlay network", 3.2),
                TaskStep::new(format!("Applying {design_pattern} design pattern"), 2.5),
                TaskStep::new("Running connectivity tests", 2.0),
                TaskStep::new("Validating redundancy", 1.8),
                TaskStep::new("Generating deployment report", 1.2),
            ],
        }
    }

    /// Steps for bringing up a PoP with `provider`.
    #[must_use]
    pub fn pop_deployment(pop_name: &str, change_number: &str, provider: &str) -> Self {
        Self {
            task_name: format!("PoP Deployment: {pop_name}"),
            change_number: change_number.to_string(),
            original_request_id: EventKind::PopDeployment.request_id(change_number),
            steps: vec![
                TaskStep::new("Coordinating with provider", 2.0),
                TaskStep::new(format!("Provisioning {provider} infrastructure"), 3.5),
                TaskStep::new("Installing edge devices", 2.8),
                TaskStep::new("Configuring routing protocols", 2.5),
                TaskStep::new("Establishing provider connections", 3.0),
                TaskStep::new("Testing end-to-end connectivity", 2.2),
                TaskStep::new("Validating SLA requirements", 1.8),
                TaskStep::new("Updating network documentation", 1.5),
            ],
        }
    }

    /// Sum of nominal step durations, seconds.
    #[must_use]
    pub fn nominal_secs(&self) -> f64 {
        self.steps.iter().map(|s| s.nominal_secs).sum()
    }
}

/// How a simulated task ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Every step ran and every event was published
    Completed {
        /// Steps executed
        steps_completed: usize,
    },
    /// Publishing a task event failed; later steps were skipped
    Failed {
        /// Step (or phase) being reported when publishing failed
        step: String,
        /// Bus error
        reason: String,
    },
}

/// Runs [`TaskPlan`]s against an event bus.
#[derive(Clone)]
pub struct TaskSimulator {
    bus: Arc<dyn EventBus>,
    topics: Topics,
    clock: Arc<dyn Clock>,
    time_scale: f64,
}

impl TaskSimulator {
    /// Simulator publishing to `bus` under `topics`.
    ///
    /// `time_scale` multiplies nominal step durations into real pauses.
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>, topics: Topics, clock: Arc<dyn Clock>, time_scale: f64) -> Self {
        Self {
            bus,
            topics,
            clock,
            time_scale: time_scale.max(0.0),
        }
    }

    /// Walk the plan, publishing its lifecycle. Stops at the first failed publish.
    #[tracing::instrument(skip(self, plan), fields(task = %plan.task_name, change_number = %plan.change_number))]
    pub async fn run(&self, plan: TaskPlan) -> TaskOutcome {
        let total = plan.steps.len();

        if let Err(reason) = self
            .status(&plan, TaskStatus::InProgress, 0, format!("Starting {}...", plan.task_name), None)
            .await
        {
            return failed("start", reason);
        }

        for (i, step) in plan.steps.iter().enumerate() {
            let remaining = i64::try_from(total - i).unwrap_or(i64::MAX);
            let estimate = self.clock.now() + TimeDelta::seconds(remaining * ESTIMATE_PER_STEP_SECS);
            if let Err(reason) = self
                .status(
                    &plan,
                    TaskStatus::InProgress,
                    percent(i, total),
                    format!("Executing: {}", step.name),
                    Some(estimate),
                )
                .await
            {
                return failed(&step.name, reason);
            }

            if self.time_scale > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(step.nominal_secs * self.time_scale)).await;
            }
            tracing::debug!(step = %step.name, "task step done");
        }

        let done = format!("Task completed successfully: {}", plan.task_name);
        if let Err(reason) = self
            .status(&plan, TaskStatus::Completed, 100, done.clone(), None)
            .await
        {
            return failed("completion", reason);
        }

        let completion = TaskCompletionEvent {
            header: EventHeader::new(EventKind::TaskCompletion, &plan.change_number, self.clock.now(), None),
            original_request_id: plan.original_request_id.clone(),
            completion_status: CompletionStatus::Completed,
            completion_message: Some(done),
            result_data: Some(serde_json::json!({
                "steps_completed": total,
                "execution_time": plan.nominal_secs(),
            })),
            error_details: None,
            execution_duration: Some(plan.nominal_secs()),
        };
        if let Err(reason) = self.publish(EventKind::TaskCompletion, &completion).await {
            return failed("completion", reason);
        }

        tracing::info!(steps = total, "task completed");
        TaskOutcome::Completed {
            steps_completed: total,
        }
    }

    async fn status(
        &self,
        plan: &TaskPlan,
        status: TaskStatus,
        progress: u8,
        message: String,
        estimated_completion: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), String> {
        let event = TaskStatusUpdateEvent {
            header: EventHeader::new(EventKind::TaskStatusUpdate, &plan.change_number, self.clock.now(), None),
            original_request_id: plan.original_request_id.clone(),
            status,
            progress_percentage: Some(progress),
            status_message: Some(message),
            error_details: None,
            estimated_completion,
        };
        self.publish(EventKind::TaskStatusUpdate, &event).await
    }

    async fn publish<E: Event + Serialize>(&self, kind: EventKind, event: &E) -> Result<(), String> {
        let serialized = SerializedEvent::from_event(event, None).map_err(|e| e.to_string())?;
        self.bus
            .publish(&self.topics.for_kind(kind), &serialized)
            .await
            .map_err(|e| e.to_string())
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(done * 100 / total).unwrap_or(100)
}

fn failed(step: &str, reason: String) -> TaskOutcome {
    tracing::warn!(step, reason = %reason, "task aborted: event could not be published");
    TaskOutcome::Failed {
        step: step.to_string(),
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use franc_portal_testing::mocks::{FailingEventBus, InMemoryEventBus};
    use franc_portal_testing::test_clock;

    fn simulator(bus: Arc<dyn EventBus>) -> TaskSimulator {
        TaskSimulator::new(bus, Topics::default(), Arc::new(test_clock()), 0.0)
    }

    #[test]
    fn plans_match_service_step_lists() {
        let device = TaskPlan::device_connection("SW01", "CHG-1", 4);
        assert_eq!(device.steps.len(), 7);
        assert_eq!(device.steps[3].name, "Configuring 4 data interfaces");
        assert_eq!(device.original_request_id, "device_conn_CHG-1");
        assert!((device.nominal_secs() - 13.5).abs() < 1e-9);

        let dc = TaskPlan::datacenter_deployment("DC1", "CHG-2", "Spine-Leaf");
        assert_eq!(dc.steps.len(), 9);
        assert_eq!(dc.steps[5].name, "Applying Spine-Leaf design pattern");

        let pop = TaskPlan::pop_deployment("POP1", "CHG-3", "Equinix");
        assert_eq!(pop.steps.len(), 8);
        assert_eq!(pop.steps[1].name, "Provisioning Equinix infrastructure");
        assert_eq!(pop.task_name, "PoP Deployment: POP1");
    }

    #[tokio::test]
    async fn publishes_full_lifecycle() {
        let bus = Arc::new(InMemoryEventBus::new());
        let plan = TaskPlan::pop_deployment("POP1", "CHG-3", "Equinix");

        let outcome = simulator(bus.clone()).run(plan).await;
        assert_eq!(outcome, TaskOutcome::Completed { steps_completed: 8 });

        let statuses = bus.payloads_for("franc.task.status");
        assert_eq!(statuses.len(), 10);
        assert_eq!(statuses[0]["status_message"], "Starting PoP Deployment: POP1...");
        assert_eq!(statuses[0]["progress_percentage"], 0);
        assert_eq!(statuses[2]["progress_percentage"], 12);
        assert_eq!(statuses[2]["estimated_completion"], "2025-01-01T00:00:14Z");
        assert_eq!(statuses[9]["status"], "completed");
        assert_eq!(statuses[9]["progress_percentage"], 100);

        let completions = bus.payloads_for("franc.task.completion");
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0]["original_request_id"], "pop_CHG-3");
        assert_eq!(completions[0]["result_data"]["steps_completed"], 8);
        assert_eq!(completions[0]["request_id"], "completion_CHG-3");

        assert!(bus.published().iter().all(|(_, e)| e.key == "CHG-3"));
    }

    #[tokio::test]
    async fn failed_publish_aborts_remaining_steps() {
        let bus = Arc::new(FailingEventBus::failing_after(2));
        let plan = TaskPlan::device_connection("SW01", "CHG-1", 2);

        let outcome = simulator(bus.clone()).run(plan).await;
        assert_eq!(
            outcome,
            TaskOutcome::Failed {
                step: "Backing up current configuration".to_string(),
                reason: "Publish failed for topic 'franc.task.status': broker unavailable"
                    .to_string(),
            }
        );
        assert_eq!(bus.attempts(), 3);
    }
}
