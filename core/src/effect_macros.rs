//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, mostly
//! the boxed callbacks an event bus publish needs.

/// Create an `Effect::PublishEvent` operation
///
/// # Example
///
/// ```rust,ignore
/// use franc_portal_core::publish_event;
///
/// publish_event! {
///     bus: event_bus,
///     topic: "franc.device.connection",
///     event: serialized_event,
///     on_success: || Some(PortalAction::EventPublished),
///     on_error: |error| Some(PortalAction::PublishFailed { reason: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! publish_event {
    (
        bus: $bus:expr,
        topic: $topic:expr,
        event: $event:expr,
        on_success: || $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::PublishEvent(
            $crate::effect::EventBusOperation::Publish {
                event_bus: ::std::sync::Arc::clone(&$bus),
                topic: $topic.to_string(),
                event: $event,
                on_success: ::std::boxed::Box::new(move |()| $success_body),
                on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
            }
        )
    };
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use franc_portal_core::async_effect;
///
/// async_effect! {
///     let lookup = resolver.resolve(kind, &filters).await;
///     Some(PortalAction::OptionsResolved { field, lookup })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Background` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use franc_portal_core::background_effect;
///
/// background_effect! {
///     let outcome = simulator.run(plan).await;
///     Some(PortalAction::TaskFinished { task_name, outcome })
/// }
/// ```
#[macro_export]
macro_rules! background_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Background(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;
    use crate::event::SerializedEvent;
    use crate::event_bus::{BusFuture, EventBus};
    use std::sync::Arc;

    #[derive(Clone, Debug)]
    enum TestAction {
        AsyncResult { value: i32 },
        TimeoutExpired,
        Published,
        Failed { reason: String },
    }

    struct NullBus;

    impl EventBus for NullBus {
        fn publish(&self, _topic: &str, _event: &SerializedEvent) -> BusFuture<'_> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::AsyncResult { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_background_effect_macro() {
        let effect = background_effect! {
            Some(TestAction::TimeoutExpired)
        };

        assert!(matches!(effect, Effect::Background(_)));
        assert!(effect.published_topics().is_empty());
    }

    #[test]
    fn test_publish_event_macro() {
        let bus: Arc<dyn EventBus> = Arc::new(NullBus);
        let event = SerializedEvent::new(
            "pop_deployment".to_string(),
            "CHG-1".to_string(),
            b"{}".to_vec(),
            None,
        );

        let effect: Effect<TestAction> = publish_event! {
            bus: bus,
            topic: "franc.pop.deployment",
            event: event,
            on_success: || Some(TestAction::Published),
            on_error: |error| Some(TestAction::Failed { reason: error.to_string() })
        };

        assert_eq!(effect.published_topics(), vec!["franc.pop.deployment"]);
    }
}
