//! # FRANC Portal Testing
//!
//! Testing utilities and helpers for the FRANC service portal.
//!
//! This crate provides:
//! - Mock implementations of the environment seams (clock, event bus, inventory)
//! - A Given-When-Then harness for reducers
//! - Property-based testing strategies for form input
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use franc_portal_testing::{test_clock, mocks::InMemoryEventBus};
//! use franc_portal_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_submission_publishes() {
//!     let bus = Arc::new(InMemoryEventBus::new());
//!     let store = Store::new(PortalState::default(), PortalReducer::new(), env_with(bus.clone()));
//!
//!     store.send(PortalAction::Submit).await?;
//!
//!     assert_eq!(bus.topics(), vec!["franc.pop.deployment"]);
//! }
//! ```

use chrono::{DateTime, Utc};
use franc_portal_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use franc_portal_core::event::SerializedEvent;
    use franc_portal_core::event_bus::{BusFuture, EventBus, EventBusError};
    use franc_portal_core::inventory::{
        BranchFuture, BranchManager, InventoryKind, OptionFilter, OptionSource,
        OptionSourceError, OptionsFuture, SelectOption,
    };
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use franc_portal_testing::mocks::FixedClock;
    /// use franc_portal_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Event bus that keeps every published event in memory.
    ///
    /// Can be switched to report itself disabled, which is how the portal
    /// runs when Kafka is turned off.
    #[derive(Debug, Default)]
    pub struct InMemoryEventBus {
        published: Mutex<Vec<(String, SerializedEvent)>>,
        disabled: bool,
    }

    impl InMemoryEventBus {
        /// An enabled bus with nothing published yet
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A bus whose `is_enabled` returns false
        #[must_use]
        pub fn disabled() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                disabled: true,
            }
        }

        /// Everything published so far, as `(topic, event)` pairs
        #[must_use]
        pub fn published(&self) -> Vec<(String, SerializedEvent)> {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Topics published to, in order
        #[must_use]
        pub fn topics(&self) -> Vec<String> {
            self.published().into_iter().map(|(topic, _)| topic).collect()
        }

        /// Decoded JSON payloads published to `topic`, in order
        #[must_use]
        pub fn payloads_for(&self, topic: &str) -> Vec<serde_json::Value> {
            self.published()
                .into_iter()
                .filter(|(t, _)| t == topic)
                .filter_map(|(_, event)| event.payload().ok())
                .collect()
        }
    }

    impl EventBus for InMemoryEventBus {
        fn publish(&self, topic: &str, event: &SerializedEvent) -> BusFuture<'_> {
            let entry = (topic.to_string(), event.clone());
            Box::pin(async move {
                self.published
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(entry);
                Ok(())
            })
        }

        fn is_enabled(&self) -> bool {
            !self.disabled
        }
    }

    /// Event bus that rejects publishes.
    ///
    /// By default every publish fails. `failing_after(n)` accepts the first
    /// `n` publishes and fails the rest.
    #[derive(Debug, Default)]
    pub struct FailingEventBus {
        accept: usize,
        attempts: Mutex<usize>,
    }

    impl FailingEventBus {
        /// A bus on which every publish fails
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A bus that accepts `accept` publishes, then fails
        #[must_use]
        pub fn failing_after(accept: usize) -> Self {
            Self {
                accept,
                attempts: Mutex::new(0),
            }
        }

        /// Number of publish attempts seen
        #[must_use]
        pub fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl EventBus for FailingEventBus {
        fn publish(&self, topic: &str, _event: &SerializedEvent) -> BusFuture<'_> {
            let topic = topic.to_string();
            Box::pin(async move {
                let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
                *attempts += 1;
                if *attempts <= self.accept {
                    return Ok(());
                }
                Err(EventBusError::PublishFailed {
                    topic,
                    reason: "broker unavailable".to_string(),
                })
            })
        }

        fn check_connection(&self) -> BusFuture<'_> {
            Box::pin(async { Err(EventBusError::ConnectionFailed("no brokers".to_string())) })
        }
    }

    /// Option source answering from a fixed table.
    ///
    /// Kinds without an entry answer with an empty list. Every query is
    /// recorded so tests can assert on the filters used.
    #[derive(Debug, Default)]
    pub struct StaticOptionSource {
        options: HashMap<InventoryKind, Vec<SelectOption>>,
        queries: Mutex<Vec<(InventoryKind, Vec<OptionFilter>)>>,
    }

    impl StaticOptionSource {
        /// An empty inventory
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Register options for a kind
        #[must_use]
        pub fn with(mut self, kind: InventoryKind, labels: &[&str]) -> Self {
            let options = labels
                .iter()
                .enumerate()
                .map(|(i, label)| SelectOption::new(*label, format!("{}-{i}", kind.as_str())))
                .collect();
            self.options.insert(kind, options);
            self
        }

        /// A small inventory with every kind populated
        #[must_use]
        pub fn populated() -> Self {
            Self::new()
                .with(InventoryKind::DcimDeviceType, &["DCS-7280SR", "N9K-C93180YC"])
                .with(InventoryKind::LocationBuilding, &["AMS-1", "FRA-2"])
                .with(InventoryKind::LocationMetro, &["Amsterdam", "Frankfurt"])
                .with(InventoryKind::DesignTopology, &["PoP Standard", "DC Spine-Leaf"])
                .with(InventoryKind::OrganizationProvider, &["Equinix", "Interxion"])
        }

        /// Every query seen, in order
        #[must_use]
        pub fn queries(&self) -> Vec<(InventoryKind, Vec<OptionFilter>)> {
            self.queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl OptionSource for StaticOptionSource {
        fn fetch_options<'a>(
            &'a self,
            kind: InventoryKind,
            filters: &'a [OptionFilter],
        ) -> OptionsFuture<'a> {
            Box::pin(async move {
                self.queries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((kind, filters.to_vec()));
                Ok(self.options.get(&kind).cloned().unwrap_or_default())
            })
        }
    }

    /// Option source whose every lookup fails.
    #[derive(Debug, Clone)]
    pub struct UnavailableOptionSource {
        error: OptionSourceError,
    }

    impl UnavailableOptionSource {
        /// Fail with `Unreachable("connection refused")`
        #[must_use]
        pub fn new() -> Self {
            Self::with_error(OptionSourceError::Unreachable("connection refused".to_string()))
        }

        /// Fail with a specific error
        #[must_use]
        pub const fn with_error(error: OptionSourceError) -> Self {
            Self { error }
        }
    }

    impl Default for UnavailableOptionSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl OptionSource for UnavailableOptionSource {
        fn fetch_options<'a>(
            &'a self,
            _kind: InventoryKind,
            _filters: &'a [OptionFilter],
        ) -> OptionsFuture<'a> {
            let error = self.error.clone();
            Box::pin(async move { Err(error) })
        }
    }

    /// Option source that never answers before `delay` elapses.
    #[derive(Debug, Clone, Copy)]
    pub struct SlowOptionSource {
        delay: Duration,
    }

    impl SlowOptionSource {
        /// Answer (with no options) after `delay`
        #[must_use]
        pub const fn new(delay: Duration) -> Self {
            Self { delay }
        }
    }

    impl OptionSource for SlowOptionSource {
        fn fetch_options<'a>(
            &'a self,
            _kind: InventoryKind,
            _filters: &'a [OptionFilter],
        ) -> OptionsFuture<'a> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                Ok(Vec::new())
            })
        }
    }

    /// Branch manager that records requested branch names.
    #[derive(Debug, Default)]
    pub struct RecordingBranchManager {
        created: Mutex<Vec<String>>,
        refuse: Option<OptionSourceError>,
    }

    impl RecordingBranchManager {
        /// Accept every branch
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Refuse every branch with `error`
        #[must_use]
        pub fn refusing(error: OptionSourceError) -> Self {
            Self {
                created: Mutex::new(Vec::new()),
                refuse: Some(error),
            }
        }

        /// Branch names requested so far
        #[must_use]
        pub fn created(&self) -> Vec<String> {
            self.created
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl BranchManager for RecordingBranchManager {
        fn create_branch<'a>(&'a self, name: &'a str) -> BranchFuture<'a> {
            Box::pin(async move {
                self.created
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(name.to_string());
                match &self.refuse {
                    Some(error) => Err(error.clone()),
                    None => Ok(()),
                }
            })
        }
    }
}

/// Property-based testing strategies for form input.
pub mod properties {
    use proptest::prelude::*;

    /// Change numbers such as `CHG-2024-004217`
    pub fn change_number() -> impl Strategy<Value = String> {
        (2020u32..2030, 0u32..1_000_000).prop_map(|(year, n)| format!("CHG-{year}-{n:06}"))
    }

    /// Interface names such as `Ethernet1/12` or `Gi0/3`
    pub fn interface_name() -> impl Strategy<Value = String> {
        (prop_oneof![Just("Ethernet"), Just("Gi"), Just("Te")], 0u8..4, 0u8..48)
            .prop_map(|(prefix, slot, port)| format!("{prefix}{slot}/{port}"))
    }

    /// Free text that is blank after trimming
    pub fn blank_text() -> impl Strategy<Value = String> {
        "[ \t\n]{0,6}"
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::mocks::*;
    use super::*;
    use franc_portal_core::event::SerializedEvent;
    use franc_portal_core::event_bus::EventBus;
    use franc_portal_core::inventory::{
        BranchManager, InventoryKind, OptionFilter, OptionSource, OptionSourceError,
    };
    use proptest::prelude::*;

    fn event(key: &str) -> SerializedEvent {
        SerializedEvent::new(
            "device_connection".to_string(),
            key.to_string(),
            br#"{"change_number":"CHG-1"}"#.to_vec(),
            None,
        )
    }

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[tokio::test]
    async fn in_memory_bus_records_topics_and_payloads() {
        let bus = InMemoryEventBus::new();
        bus.publish("franc.device.connection", &event("CHG-1")).await.unwrap();
        bus.publish("franc.task.status", &event("CHG-1")).await.unwrap();

        assert!(bus.is_enabled());
        assert_eq!(bus.topics(), vec!["franc.device.connection", "franc.task.status"]);
        assert_eq!(
            bus.payloads_for("franc.device.connection")[0]["change_number"],
            "CHG-1"
        );
        assert!(!InMemoryEventBus::disabled().is_enabled());
    }

    #[tokio::test]
    async fn failing_bus_accepts_then_fails() {
        let bus = FailingEventBus::failing_after(1);
        assert!(bus.publish("t", &event("k")).await.is_ok());
        assert!(bus.publish("t", &event("k")).await.is_err());
        assert_eq!(bus.attempts(), 2);
        assert!(bus.check_connection().await.is_err());
    }

    #[tokio::test]
    async fn static_source_records_filters() {
        let source = StaticOptionSource::populated();
        let filters = vec![OptionFilter::new("type__value", "PoP")];
        let options = source
            .fetch_options(InventoryKind::DesignTopology, &filters)
            .await
            .unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "PoP Standard");
        assert_eq!(source.queries()[0].1, filters);
    }

    #[tokio::test]
    async fn branch_manager_records_and_refuses() {
        let accepting = RecordingBranchManager::new();
        accepting.create_branch("implement_chg-1").await.unwrap();
        assert_eq!(accepting.created(), vec!["implement_chg-1"]);

        let refusing =
            RecordingBranchManager::refusing(OptionSourceError::Rejected("exists".to_string()));
        assert!(refusing.create_branch("implement_chg-1").await.is_err());
    }

    proptest! {
        #[test]
        fn generated_interface_names_have_a_slot(name in properties::interface_name()) {
            prop_assert!(name.contains('/'));
        }

        #[test]
        fn blank_text_trims_to_empty(text in properties::blank_text()) {
            prop_assert!(text.trim().is_empty());
        }
    }
}
