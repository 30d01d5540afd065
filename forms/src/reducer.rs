//! The portal reducer: one form session as state, user input as actions.
//!
//! Submission is a small state machine:
//!
//! ```text
//! Idle/Rejected/Accepted/Failed --Submit--> Rejected            (invalid)
//!                               --Submit--> Deploying           (DC with branch workflow)
//!                               --Submit--> Publishing          (bus enabled)
//!                               --Submit--> Accepted            (bus disabled)
//! Deploying  --WorkflowFinished--> Publishing | Accepted | Failed
//! Publishing --Published/PublishFailed--> Accepted
//! ```
//!
//! A request is accepted even when its event could not be published; only a
//! failed deployment workflow or failed validation keeps it out.

use crate::events::Topics;
use crate::interfaces::{InterfaceEditor, MAX_INTERFACE_COUNT, RowField};
use crate::options::{OptionLookup, OptionResolver};
use crate::service::{FormState, FormView, InputError, SelectKey, Service, SubmittedRequest, TextField};
use crate::simulator::{TaskOutcome, TaskSimulator};
use crate::workflow::{WorkflowReport, datacenter_deployment};
use franc_portal_core::environment::Clock;
use franc_portal_core::event_bus::EventBus;
use franc_portal_core::inventory::BranchManager;
use franc_portal_core::{
    SmallVec, async_effect, background_effect, effect::Effect, publish_event, reducer::Reducer, smallvec,
};
use franc_portal_runtime::metrics::SubmissionMetrics;
use serde::Serialize;
use std::sync::Arc;

/// Shown after a successful publish.
pub const PUBLISHED_NOTICE: &str = "Event successfully published to Kafka for downstream processing.";

/// Shown when the request was accepted but its event was not published.
pub const PUBLISH_FAILED_NOTICE: &str = "Request submitted successfully, but failed to publish event to Kafka. Manual follow-up may be required.";

/// Shown when publishing is switched off.
pub const BUS_DISABLED_NOTICE: &str = "Kafka is disabled - events will not be published";

/// Help topic shown next to validation errors.
pub const VALIDATION_TIPS_TOPIC: &str = "validation-tips";

/// Everything the reducer needs from the outside world.
#[derive(Clone)]
pub struct PortalEnvironment {
    /// Option lookups
    pub resolver: OptionResolver,
    /// Where request and task events go
    pub event_bus: Arc<dyn EventBus>,
    /// Creates DC deployment branches
    pub branches: Arc<dyn BranchManager>,
    /// Event timestamps
    pub clock: Arc<dyn Clock>,
    /// Topic naming
    pub topics: Topics,
    /// Run the DC branch workflow before publishing
    pub create_branch: bool,
    /// Multiplier from nominal task step durations to real pauses
    pub simulator_time_scale: f64,
}

impl std::fmt::Debug for PortalEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalEnvironment")
            .field("resolver", &self.resolver)
            .field("topics", &self.topics)
            .field("create_branch", &self.create_branch)
            .field("simulator_time_scale", &self.simulator_time_scale)
            .finish_non_exhaustive()
    }
}

impl PortalEnvironment {
    /// Environment with default topics, the DC workflow on and no pacing.
    #[must_use]
    pub fn new(
        resolver: OptionResolver,
        event_bus: Arc<dyn EventBus>,
        branches: Arc<dyn BranchManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            event_bus,
            branches,
            clock,
            topics: Topics::default(),
            create_branch: true,
            simulator_time_scale: 0.0,
        }
    }

    /// Use `topics` for every event
    #[must_use]
    pub fn with_topics(mut self, topics: Topics) -> Self {
        self.topics = topics;
        self
    }

    /// Turn the DC branch workflow on or off
    #[must_use]
    pub const fn with_branch_workflow(mut self, enabled: bool) -> Self {
        self.create_branch = enabled;
        self
    }

    /// Pace the task simulator
    #[must_use]
    pub const fn with_simulator_time_scale(mut self, scale: f64) -> Self {
        self.simulator_time_scale = scale;
        self
    }

    fn simulator(&self) -> TaskSimulator {
        TaskSimulator::new(
            Arc::clone(&self.event_bus),
            self.topics.clone(),
            Arc::clone(&self.clock),
            self.simulator_time_scale,
        )
    }
}

/// What the user sees after an accepted request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    /// Service the request was for
    pub service: Service,
    /// Change number
    pub change_number: String,
    /// e.g. `device_conn_CHG-1`
    pub request_id: String,
    /// Confirmation line
    pub success_message: String,
    /// Publish notices
    pub notices: Vec<String>,
    /// Interface summary, device connection only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_summary: Option<String>,
    /// Help topic with next steps
    pub next_steps_topic: &'static str,
    /// Whether the request event reached the bus
    pub published: bool,
}

/// Where the current submission stands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Nothing submitted since the form was opened
    #[default]
    Idle,
    /// Validation failed; nothing was published
    Rejected {
        /// Every message, in field order
        errors: Vec<String>,
        /// Help topic with fixes
        help_topic: &'static str,
    },
    /// The deployment workflow is running
    Deploying,
    /// The request event is being published
    Publishing,
    /// The request was accepted
    Accepted(SubmissionOutcome),
    /// The deployment workflow failed; nothing was published
    Failed {
        /// `Deployment failed: {n} step(s) failed`
        message: String,
        /// Per-step results
        report: WorkflowReport,
    },
}

impl SubmissionStatus {
    /// True while a submission is being processed
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Deploying | Self::Publishing)
    }
}

/// State of the simulated task spawned by the last accepted request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskProgress {
    /// Running in the background
    Running {
        /// Task display name
        task_name: String,
    },
    /// Finished (or aborted)
    Finished {
        /// Task display name
        task_name: String,
        /// How it ended
        outcome: TaskOutcome,
    },
}

/// One form session.
#[derive(Clone, Debug, Default)]
pub struct PortalState {
    /// The open form, if any
    pub form: Option<FormState>,
    /// Option lookup notices for the open form
    pub notices: Vec<String>,
    /// Submission progress
    pub status: SubmissionStatus,
    /// Request being deployed or published
    pub pending: Option<SubmittedRequest>,
    /// Last task started from this session
    pub task: Option<TaskProgress>,
    /// Last input the form refused
    pub input_error: Option<InputError>,
}

/// Serializable view of a session.
#[derive(Clone, Debug, Serialize)]
pub struct PortalView {
    /// The open form
    pub form: Option<FormView>,
    /// Option lookup notices
    pub notices: Vec<String>,
    /// Submission progress
    pub status: SubmissionStatus,
    /// Simulated task
    pub task: Option<TaskProgress>,
    /// Last refused input
    pub input_error: Option<String>,
}

impl PortalState {
    /// Session with `service` open and no options loaded
    #[must_use]
    pub fn for_service(service: Service) -> Self {
        Self {
            form: Some(FormState::for_service(service)),
            ..Self::default()
        }
    }

    /// Open service, if any
    #[must_use]
    pub fn service(&self) -> Option<Service> {
        self.form.as_ref().map(FormState::service)
    }

    /// Interface editor of an open device connection form
    #[must_use]
    pub fn interfaces(&self) -> Option<&InterfaceEditor> {
        match &self.form {
            Some(FormState::DeviceConnection(f)) => Some(&f.interfaces),
            _ => None,
        }
    }

    /// Serializable snapshot
    #[must_use]
    pub fn view(&self) -> PortalView {
        PortalView {
            form: self.form.as_ref().map(FormState::view),
            notices: self.notices.clone(),
            status: self.status.clone(),
            task: self.task.clone(),
            input_error: self.input_error.as_ref().map(ToString::to_string),
        }
    }
}

/// Everything that can happen to a session.
#[derive(Clone, Debug)]
pub enum PortalAction {
    // Commands
    /// Open a blank form and load its options
    OpenService {
        /// Service to open
        service: Service,
    },
    /// Close the form
    CloseService,
    /// Set a free-text field
    SetText {
        /// Field
        field: TextField,
        /// New value
        value: String,
    },
    /// Choose an option by label or id
    Select {
        /// Field
        key: SelectKey,
        /// Label or id
        value: String,
    },
    /// Resize the interface rows
    SetInterfaceCount {
        /// New count
        count: usize,
    },
    /// Change one attribute of one row
    UpdateInterface {
        /// Row position
        index: usize,
        /// Attribute and value
        field: RowField,
    },
    /// Resize the vPC group vocabulary
    SetGroupCount {
        /// New count
        count: usize,
    },
    /// Rename a vPC group
    RenameGroup {
        /// Current name
        old: String,
        /// New name
        new: String,
    },
    /// Validate and submit the form
    Submit,

    // Effect feedback
    /// An option lookup finished
    OptionsResolved {
        /// Form the lookup was for
        service: Service,
        /// Field the options are for
        key: SelectKey,
        /// Options or notice
        lookup: OptionLookup,
    },
    /// The DC deployment workflow finished
    WorkflowFinished {
        /// What ran
        report: WorkflowReport,
    },
    /// The request event was published
    Published,
    /// The request event could not be published
    PublishFailed {
        /// Bus error
        reason: String,
    },
    /// The simulated task finished
    TaskFinished {
        /// Task the outcome belongs to
        task_name: String,
        /// How it ended
        outcome: TaskOutcome,
    },
}

/// Reducer for one form session.
#[derive(Clone, Debug, Default)]
pub struct PortalReducer;

impl PortalReducer {
    /// New reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open(state: &mut PortalState, service: Service, env: &PortalEnvironment) -> Effect<PortalAction> {
        let form = FormState::for_service(service);
        let lookups = form
            .option_queries()
            .into_iter()
            .map(|query| {
                let resolver = env.resolver.clone();
                async_effect! {
                    let lookup = resolver.resolve(query.kind, &query.filters).await;
                    Some(PortalAction::OptionsResolved { service, key: query.key, lookup })
                }
            })
            .collect();

        *state = PortalState {
            form: Some(form),
            task: state.task.take(),
            ..PortalState::default()
        };
        tracing::debug!(service = %service, "form opened");
        Effect::merge(lookups)
    }

    fn edit(
        state: &mut PortalState,
        apply: impl FnOnce(&mut FormState) -> Result<(), InputError>,
    ) {
        let result = if state.status.is_in_flight() {
            Err(InputError::SubmissionInProgress)
        } else {
            state.form.as_mut().map_or(Err(InputError::NoActiveForm), apply)
        };
        if let Err(error) = &result {
            tracing::debug!(error = %error, "input refused");
        }
        state.input_error = result.err();
    }

    fn submit(state: &mut PortalState, env: &PortalEnvironment) -> SmallVec<[Effect<PortalAction>; 4]> {
        if state.status.is_in_flight() {
            state.input_error = Some(InputError::SubmissionInProgress);
            return SmallVec::new();
        }
        let Some(form) = &state.form else {
            state.input_error = Some(InputError::NoActiveForm);
            return SmallVec::new();
        };
        state.input_error = None;

        let request = match form.submit() {
            Ok(request) => request,
            Err(result) => {
                let service = form.service();
                tracing::info!(service = %service, errors = result.len(), "submission rejected");
                SubmissionMetrics::record_rejected(service.as_str());
                state.status = SubmissionStatus::Rejected {
                    errors: result.into_errors(),
                    help_topic: VALIDATION_TIPS_TOPIC,
                };
                return SmallVec::new();
            },
        };

        if request.service() == Service::DataCenterDeployment && env.create_branch {
            let workflow = datacenter_deployment(Arc::clone(&env.branches), request.change_number());
            state.status = SubmissionStatus::Deploying;
            state.pending = Some(request);
            return smallvec![async_effect! {
                let report = workflow.execute().await;
                Some(PortalAction::WorkflowFinished { report })
            }];
        }

        Self::publish(state, request, env)
    }

    fn publish(
        state: &mut PortalState,
        request: SubmittedRequest,
        env: &PortalEnvironment,
    ) -> SmallVec<[Effect<PortalAction>; 4]> {
        if !env.event_bus.is_enabled() {
            Self::accept(state, request, BUS_DISABLED_NOTICE, false);
            return SmallVec::new();
        }

        match request.to_event(env.clock.now(), None) {
            Ok(event) => {
                let topic = env.topics.for_kind(request.service().event_kind());
                state.status = SubmissionStatus::Publishing;
                state.pending = Some(request);
                smallvec![publish_event! {
                    bus: env.event_bus,
                    topic: topic,
                    event: event,
                    on_success: || Some(PortalAction::Published),
                    on_error: |error| Some(PortalAction::PublishFailed { reason: error.to_string() })
                }]
            },
            Err(error) => {
                tracing::warn!(error = %error, "request event could not be encoded");
                Self::accept(state, request, PUBLISH_FAILED_NOTICE, false);
                SmallVec::new()
            },
        }
    }

    fn accept(state: &mut PortalState, request: SubmittedRequest, notice: &str, published: bool) {
        let service = request.service();
        tracing::info!(
            service = %service,
            change_number = request.change_number(),
            published,
            "request accepted"
        );
        SubmissionMetrics::record_accepted(service.as_str());

        state.status = SubmissionStatus::Accepted(SubmissionOutcome {
            service,
            change_number: request.change_number().to_string(),
            request_id: request.request_id(),
            success_message: request.success_message(),
            notices: vec![notice.to_string()],
            interface_summary: request.interface_summary(),
            next_steps_topic: service.next_steps_topic(),
            published,
        });
        state.pending = None;
        if let Some(form) = state.form.as_mut() {
            form.clear_inputs();
        }
    }

    /// Start the simulated task for an accepted, published request.
    ///
    /// Unpaced runs finish inside the submission. Paced runs go to the
    /// background and report their outcome to the session when done.
    fn simulate(
        state: &mut PortalState,
        request: &SubmittedRequest,
        env: &PortalEnvironment,
    ) -> Effect<PortalAction> {
        let plan = request.task_plan();
        let simulator = env.simulator();
        let task_name = plan.task_name.clone();
        state.task = Some(TaskProgress::Running {
            task_name: task_name.clone(),
        });

        if env.simulator_time_scale > 0.0 {
            background_effect! {
                let outcome = simulator.run(plan).await;
                Some(PortalAction::TaskFinished { task_name, outcome })
            }
        } else {
            async_effect! {
                let outcome = simulator.run(plan).await;
                Some(PortalAction::TaskFinished { task_name, outcome })
            }
        }
    }
}

impl Reducer for PortalReducer {
    type State = PortalState;
    type Action = PortalAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PortalAction::OpenService { service } => smallvec![Self::open(state, service, env)],

            PortalAction::CloseService => {
                *state = PortalState {
                    task: state.task.take(),
                    ..PortalState::default()
                };
                SmallVec::new()
            },

            PortalAction::SetText { field, value } => {
                Self::edit(state, |form| form.set_text(field, value));
                SmallVec::new()
            },

            PortalAction::Select { key, value } => {
                Self::edit(state, |form| form.select(key, &value));
                SmallVec::new()
            },

            PortalAction::SetInterfaceCount { count } => {
                Self::edit(state, |form| {
                    let editor = form.interfaces_mut()?;
                    if count > MAX_INTERFACE_COUNT {
                        return Err(InputError::TooManyInterfaces {
                            requested: count,
                            max: MAX_INTERFACE_COUNT,
                        });
                    }
                    editor.set_interface_count(count);
                    Ok(())
                });
                SmallVec::new()
            },

            PortalAction::UpdateInterface { index, field } => {
                Self::edit(state, |form| {
                    form.interfaces_mut()?.update_row(index, field);
                    Ok(())
                });
                SmallVec::new()
            },

            PortalAction::SetGroupCount { count } => {
                Self::edit(state, |form| {
                    form.interfaces_mut()?.set_group_count(count);
                    Ok(())
                });
                SmallVec::new()
            },

            PortalAction::RenameGroup { old, new } => {
                Self::edit(state, |form| {
                    form.interfaces_mut()?.rename_group(&old, &new)?;
                    Ok(())
                });
                SmallVec::new()
            },

            PortalAction::Submit => Self::submit(state, env),

            PortalAction::OptionsResolved {
                service,
                key,
                lookup,
            } => {
                let Some(form) = state.form.as_mut().filter(|f| f.service() == service) else {
                    tracing::debug!(service = %service, "dropping options for a closed form");
                    return SmallVec::new();
                };
                if let Some(notice) = &lookup.notice {
                    state.notices.push(notice.clone());
                }
                if let Ok(field) = form.selection_mut(key) {
                    field.apply(lookup);
                }
                SmallVec::new()
            },

            PortalAction::WorkflowFinished { report } => {
                if state.status != SubmissionStatus::Deploying {
                    return SmallVec::new();
                }
                let Some(request) = state.pending.take() else {
                    state.status = SubmissionStatus::Idle;
                    return SmallVec::new();
                };
                if report.succeeded() {
                    return Self::publish(state, request, env);
                }

                let message = report.summary();
                tracing::warn!(change_number = request.change_number(), %message, "deployment workflow failed");
                SubmissionMetrics::record_deployment_failed(request.service().as_str());
                state.status = SubmissionStatus::Failed { message, report };
                SmallVec::new()
            },

            PortalAction::Published => {
                if state.status != SubmissionStatus::Publishing {
                    return SmallVec::new();
                }
                let Some(request) = state.pending.take() else {
                    state.status = SubmissionStatus::Idle;
                    return SmallVec::new();
                };
                let task = Self::simulate(state, &request, env);
                Self::accept(state, request, PUBLISHED_NOTICE, true);
                smallvec![task]
            },

            PortalAction::PublishFailed { reason } => {
                if state.status != SubmissionStatus::Publishing {
                    return SmallVec::new();
                }
                let Some(request) = state.pending.take() else {
                    state.status = SubmissionStatus::Idle;
                    return SmallVec::new();
                };
                tracing::warn!(change_number = request.change_number(), %reason, "request event not published");
                Self::accept(state, request, PUBLISH_FAILED_NOTICE, false);
                SmallVec::new()
            },

            PortalAction::TaskFinished { task_name, outcome } => {
                let current = matches!(
                    &state.task,
                    Some(TaskProgress::Running { task_name: running }) if *running == task_name
                );
                if current {
                    if let TaskOutcome::Failed { step, reason } = &outcome {
                        tracing::warn!(task = %task_name, %step, %reason, "simulated task failed");
                    }
                    state.task = Some(TaskProgress::Finished { task_name, outcome });
                } else {
                    tracing::debug!(task = %task_name, "ignoring outcome of a superseded task");
                }
                SmallVec::new()
            },
        }
    }
}
