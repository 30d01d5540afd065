//! Ordered multi-step operations against the inventory.
//!
//! A [`Workflow`] runs named async steps one after another and stops at the
//! first failure, since every step depends on the previous ones. The
//! resulting [`WorkflowReport`] says what ran and what failed.

use franc_portal_core::inventory::BranchManager;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type StepFuture = Pin<Box<dyn Future<Output = Result<String, String>> + Send>>;
type StepFn = Box<dyn FnOnce() -> StepFuture + Send>;

/// Outcome of one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    /// Step finished; carries its message
    Success {
        /// Step name
        step: String,
        /// What the step did
        message: String,
    },
    /// Step failed; carries the error
    Failed {
        /// Step name
        step: String,
        /// Why it failed
        error: String,
    },
}

/// What happened when a workflow ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Workflow display name
    pub workflow: String,
    /// Steps that succeeded
    pub success_count: usize,
    /// Steps that failed (0 or 1, since execution stops)
    pub error_count: usize,
    /// Steps that ran
    pub total_steps: usize,
    /// Per-step results in execution order
    pub steps: Vec<StepResult>,
}

impl WorkflowReport {
    /// True when no step failed
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error_count == 0
    }

    /// User-facing summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.succeeded() {
            format!(
                "{} completed successfully! ({}/{} steps)",
                self.workflow, self.success_count, self.total_steps
            )
        } else {
            format!("Deployment failed: {} step(s) failed", self.error_count)
        }
    }
}

/// A named sequence of steps.
pub struct Workflow {
    name: String,
    steps: Vec<(String, StepFn)>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("steps", &names)
            .finish()
    }
}

impl Workflow {
    /// Empty workflow
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step. `run` resolves to a success message or an error.
    #[must_use]
    pub fn step<F, Fut>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.steps
            .push((name.into(), Box::new(move || Box::pin(run()) as StepFuture)));
        self
    }

    /// Run the steps in order, stopping at the first failure.
    #[tracing::instrument(skip(self), fields(workflow = %self.name))]
    pub async fn execute(self) -> WorkflowReport {
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut success_count = 0;
        let mut error_count = 0;

        for (step, run) in self.steps {
            match run().await {
                Ok(message) => {
                    tracing::info!(step = %step, "workflow step succeeded");
                    success_count += 1;
                    steps.push(StepResult::Success { step, message });
                },
                Err(error) => {
                    tracing::warn!(step = %step, error = %error, "workflow step failed");
                    error_count += 1;
                    steps.push(StepResult::Failed { step, error });
                    break;
                },
            }
        }

        WorkflowReport {
            workflow: self.name,
            success_count,
            error_count,
            total_steps: steps.len(),
            steps,
        }
    }
}

/// Branch a data-center deployment is implemented on.
#[must_use]
pub fn deployment_branch(change_number: &str) -> String {
    format!("implement_{}", change_number.trim().to_lowercase())
}

/// The data-center deployment workflow: create the implementation branch.
#[must_use]
pub fn datacenter_deployment(branches: Arc<dyn BranchManager>, change_number: &str) -> Workflow {
    let branch = deployment_branch(change_number);
    Workflow::new("Data Center Deployment").step("Creating deployment branch", move || async move {
        branches
            .create_branch(&branch)
            .await
            .map(|()| format!("Created branch {branch}"))
            .map_err(|e| e.to_string())
    })
}
