//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use franc_portal_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use franc_portal_testing::ReducerTest;
///
/// ReducerTest::new(PortalReducer::new())
///     .with_env(test_environment())
///     .given_state(PortalState::for_service(Service::DeviceConnection))
///     .when_action(PortalAction::SetInterfaceCount { count: 4 })
///     .then_state(|state| {
///         assert_eq!(state.form.interfaces().unwrap().len(), 4);
///     })
///     .then_effects(|effects| {
///         assertions::assert_no_effects(effects);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce before the action under test (Given)
    ///
    /// Effects of these actions are discarded; only the last action's
    /// effects reach `then_effects`.
    #[must_use]
    pub fn given_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        assert!(
            !self.actions.is_empty(),
            "Action must be set with when_action()"
        );

        let mut effects: smallvec::SmallVec<[Effect<A>; 4]> = smallvec::SmallVec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use franc_portal_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain at least one `PublishEvent` effect
    ///
    /// # Panics
    ///
    /// Panics if no `PublishEvent` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_publish_event_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::PublishEvent(_))),
            "Expected at least one PublishEvent effect, but none found"
        );
    }

    /// Assert that nothing in `effects` publishes, at any nesting depth
    ///
    /// # Panics
    ///
    /// Panics if a `PublishEvent` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_publishes_nothing<A>(effects: &[Effect<A>]) {
        let topics: Vec<&str> = effects.iter().flat_map(Effect::published_topics).collect();
        assert!(
            topics.is_empty(),
            "Expected no publish effects, but found topics {topics:?}"
        );
    }

    /// Assert the exact topics published, in order, at any nesting depth
    ///
    /// # Panics
    ///
    /// Panics if the published topics differ from `expected`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_publishes_to<A>(effects: &[Effect<A>], expected: &[&str]) {
        let topics: Vec<&str> = effects.iter().flat_map(Effect::published_topics).collect();
        assert_eq!(topics, expected, "Published topics differ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::InMemoryEventBus;
    use franc_portal_core::effect::Effect;
    use franc_portal_core::event::SerializedEvent;
    use franc_portal_core::event_bus::EventBus;
    use franc_portal_core::reducer::Reducer;
    use franc_portal_core::publish_event;
    use std::sync::Arc;

    #[derive(Clone, Debug)]
    struct PatchPanelState {
        ports: usize,
    }

    #[derive(Clone, Debug)]
    enum PatchPanelAction {
        AddPort,
        RemovePort,
        Announce,
        Announced,
    }

    struct PatchPanelReducer;

    struct PatchPanelEnv {
        bus: Arc<dyn EventBus>,
    }

    impl Reducer for PatchPanelReducer {
        type State = PatchPanelState;
        type Action = PatchPanelAction;
        type Environment = PatchPanelEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                PatchPanelAction::AddPort => {
                    state.ports += 1;
                    smallvec::smallvec![Effect::None]
                },
                PatchPanelAction::RemovePort => {
                    state.ports = state.ports.saturating_sub(1);
                    smallvec::smallvec![Effect::None]
                },
                PatchPanelAction::Announce => {
                    let event = SerializedEvent::new(
                        "patch_panel".to_string(),
                        "CHG-1".to_string(),
                        b"{}".to_vec(),
                        None,
                    );
                    smallvec::smallvec![Effect::merge(vec![publish_event! {
                        bus: env.bus,
                        topic: "franc.patch.panel",
                        event: event,
                        on_success: || Some(PatchPanelAction::Announced),
                        on_error: |_error| None
                    }])]
                },
                PatchPanelAction::Announced => smallvec::SmallVec::new(),
            }
        }
    }

    fn env() -> PatchPanelEnv {
        PatchPanelEnv {
            bus: Arc::new(InMemoryEventBus::new()),
        }
    }

    #[test]
    fn test_reducer_test_add_port() {
        ReducerTest::new(PatchPanelReducer)
            .with_env(env())
            .given_state(PatchPanelState { ports: 0 })
            .when_action(PatchPanelAction::AddPort)
            .then_state(|state| {
                assert_eq!(state.ports, 1);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_given_actions_apply_in_order() {
        ReducerTest::new(PatchPanelReducer)
            .with_env(env())
            .given_state(PatchPanelState { ports: 0 })
            .given_action(PatchPanelAction::AddPort)
            .given_action(PatchPanelAction::AddPort)
            .when_action(PatchPanelAction::RemovePort)
            .then_state(|state| {
                assert_eq!(state.ports, 1);
            })
            .run();
    }

    #[test]
    fn test_nested_publish_is_found() {
        ReducerTest::new(PatchPanelReducer)
            .with_env(env())
            .given_state(PatchPanelState { ports: 2 })
            .when_action(PatchPanelAction::Announce)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_publishes_to(effects, &["franc.patch.panel"]);
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<PatchPanelAction>(&[Effect::None]);
        assertions::assert_no_effects::<PatchPanelAction>(&[]);
        assertions::assert_publishes_nothing::<PatchPanelAction>(&[Effect::None]);
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<PatchPanelAction>::None], 1);
        assertions::assert_effects_count::<PatchPanelAction>(&[], 0);
    }
}
