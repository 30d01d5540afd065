//! # FRANC Portal Core
//!
//! Core traits and types for the FRANC service portal.
//!
//! The portal is built with the reducer pattern: every form session is a
//! piece of state, every user input is an action, and all I/O (inventory
//! lookups, event publishing, pacing) is described as [`effect::Effect`]
//! values that a runtime executes.
//!
//! ## Core Concepts
//!
//! - **State**: The in-progress form for one session
//! - **Action**: User inputs plus the results fed back by effects
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Seams
//!
//! - [`event_bus::EventBus`]: where submitted requests are published
//! - [`inventory::OptionSource`]: where selectable options come from
//! - [`inventory::BranchManager`]: where deployment branches are created
//! - [`environment::Clock`]: where time comes from
//!
//! ## Example
//!
//! ```ignore
//! use franc_portal_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &CounterEnvironment,
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         state.count += 1;
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod effect_macros;
pub mod event;
pub mod event_bus;
pub mod inventory;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce zero to two effects, so the result is kept
        /// inline in a [`SmallVec`].
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use crate::event::SerializedEvent;
    use crate::event_bus::{EventBus, EventBusError};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    /// Callback invoked when an event bus operation succeeds.
    pub type OnPublished<Action> = Box<dyn FnOnce(()) -> Option<Action> + Send>;

    /// Callback invoked when an event bus operation fails.
    pub type OnPublishFailed<Action> = Box<dyn FnOnce(EventBusError) -> Option<Action> + Send>;

    /// Event bus operations an effect can request.
    pub enum EventBusOperation<Action> {
        /// Publish one event to a topic.
        Publish {
            /// Bus to publish through
            event_bus: Arc<dyn EventBus>,
            /// Destination topic
            topic: String,
            /// Event to publish (carries its own partition key)
            event: SerializedEvent,
            /// Action to feed back on success
            on_success: OnPublished<Action>,
            /// Action to feed back on failure
            on_error: OnPublishFailed<Action>,
        },
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Async computation the sender does not wait for
        ///
        /// The runtime spawns it and sends its action, if any, back into the
        /// same store once it resolves.
        Background(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Publish to the event bus
        PublishEvent(EventBusOperation<Action>),
    }

    // Manual Debug implementation since Future and callbacks don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Background(_) => write!(f, "Effect::Background(<future>)"),
                Effect::PublishEvent(EventBusOperation::Publish { topic, event, .. }) => f
                    .debug_struct("Effect::PublishEvent")
                    .field("topic", topic)
                    .field("event_type", &event.event_type)
                    .field("key", &event.key)
                    .finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Topics this effect (and any nested effect) publishes to, in order.
        #[must_use]
        pub fn published_topics(&self) -> Vec<&str> {
            match self {
                Effect::PublishEvent(EventBusOperation::Publish { topic, .. }) => {
                    vec![topic.as_str()]
                },
                Effect::Parallel(effects) => effects
                    .iter()
                    .flat_map(Effect::published_topics)
                    .collect(),
                Effect::None | Effect::Future(_) | Effect::Background(_) => Vec::new(),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};

    #[derive(Debug)]
    enum TestAction {
        Tick,
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn nested_effects_report_no_topics_without_publish() {
        let effect: Effect<TestAction> = Effect::merge(vec![
            Effect::None,
            Effect::merge(vec![Effect::Background(Box::pin(async { Some(TestAction::Tick) }))]),
        ]);
        assert!(effect.published_topics().is_empty());
        assert!(format!("{effect:?}").contains("Effect::Background"));
    }
}
