//! Selectable options backed by the inventory.
//!
//! [`OptionResolver`] never fails: a lookup that errors or times out yields
//! an empty list plus a notice for the user. [`SelectField`] holds the
//! resolved options and the user's choice for one form field.

use franc_portal_core::inventory::{
    InventoryKind, OptionFilter, OptionSource, OptionSourceError, SelectOption,
};
use franc_portal_runtime::metrics::InventoryMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default bound on a single inventory lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of resolving one option list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionLookup {
    /// Options in inventory order; empty when the lookup failed
    pub options: Vec<SelectOption>,
    /// Set when the lookup failed
    pub notice: Option<String>,
}

impl OptionLookup {
    /// A successful lookup
    #[must_use]
    pub const fn loaded(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            notice: None,
        }
    }

    /// A failed lookup for `kind`
    #[must_use]
    pub fn unavailable(kind: InventoryKind, error: &OptionSourceError) -> Self {
        Self {
            options: Vec::new(),
            notice: Some(format!("Could not load {kind} options: {error}")),
        }
    }

    /// True when the inventory answered
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.notice.is_none()
    }
}

/// Resolves option lists with a bounded wait.
#[derive(Clone)]
pub struct OptionResolver {
    source: Arc<dyn OptionSource>,
    timeout: Duration,
}

impl std::fmt::Debug for OptionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OptionResolver {
    /// Resolver over `source` with the given per-lookup timeout.
    #[must_use]
    pub fn new(source: Arc<dyn OptionSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Fetch options for `kind`, degrading to an empty list on any failure.
    #[tracing::instrument(skip(self, filters), fields(kind = %kind))]
    pub async fn resolve(&self, kind: InventoryKind, filters: &[OptionFilter]) -> OptionLookup {
        let started = Instant::now();
        let fetched = tokio::time::timeout(self.timeout, self.source.fetch_options(kind, filters))
            .await
            .unwrap_or_else(|_| {
                let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                Err(OptionSourceError::Timeout(millis))
            });

        match fetched {
            Ok(options) => {
                InventoryMetrics::record_success(kind.as_str(), started.elapsed());
                tracing::debug!(count = options.len(), "options loaded");
                OptionLookup::loaded(options)
            },
            Err(error) => {
                InventoryMetrics::record_failure(kind.as_str(), started.elapsed());
                tracing::warn!(error = %error, "option lookup failed, field will be unavailable");
                OptionLookup::unavailable(kind, &error)
            },
        }
    }
}

/// A single-choice field whose choices come from the inventory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectField {
    /// Offered options
    pub options: Vec<SelectOption>,
    /// Chosen label, if any
    pub selected: Option<String>,
    /// The lookup failed; nothing can be chosen
    pub unavailable: bool,
}

impl SelectField {
    /// Replace the options with a lookup result.
    ///
    /// A previous choice survives only if the new options still offer it.
    pub fn apply(&mut self, lookup: OptionLookup) {
        self.unavailable = !lookup.is_available();
        self.options = lookup.options;
        let still_offered = self
            .selected
            .as_ref()
            .is_none_or(|s| self.options.iter().any(|o| &o.label == s));
        if !still_offered {
            self.selected = None;
        }
    }

    /// Choose by label or by id.
    ///
    /// Values matching no option are stored as given so that validation
    /// reports them.
    pub fn select(&mut self, value: &str) {
        let value = value.trim();
        let label = self
            .options
            .iter()
            .find(|o| o.label == value || o.id == value)
            .map_or(value, |o| o.label.as_str());
        self.selected = (!label.is_empty()).then(|| label.to_string());
    }

    /// Drop the choice, keep the options.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Chosen label, or empty.
    #[must_use]
    pub fn value(&self) -> &str {
        self.selected.as_deref().unwrap_or_default()
    }

    /// `"{field} is required."` unless a valid option is chosen.
    ///
    /// Manual entry is not offered, so a field with nothing to choose from
    /// (lookup failed or returned nothing) always blocks submission.
    #[must_use]
    pub fn validate(&self, field: &str) -> Option<String> {
        if self.options.is_empty() {
            return Some(format!("{field} is required."));
        }
        let labels: Vec<&str> = self.options.iter().map(|o| o.label.as_str()).collect();
        crate::validation::validate_required_selection(&labels, self.selected.as_deref(), field)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use franc_portal_testing::mocks::{SlowOptionSource, StaticOptionSource, UnavailableOptionSource};

    fn resolver(source: impl OptionSource + 'static) -> OptionResolver {
        OptionResolver::new(Arc::new(source), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn resolves_in_inventory_order() {
        let lookup = resolver(StaticOptionSource::populated())
            .resolve(InventoryKind::LocationMetro, &[])
            .await;
        assert!(lookup.is_available());
        let labels: Vec<_> = lookup.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Amsterdam", "Frankfurt"]);
    }

    #[tokio::test]
    async fn unreachable_inventory_degrades_with_notice() {
        let lookup = resolver(UnavailableOptionSource::new())
            .resolve(InventoryKind::DcimDeviceType, &[])
            .await;
        assert!(lookup.options.is_empty());
        assert_eq!(
            lookup.notice.as_deref(),
            Some("Could not load DcimDeviceType options: inventory unreachable: connection refused")
        );
    }

    #[tokio::test]
    async fn slow_inventory_times_out() {
        let lookup = resolver(SlowOptionSource::new(Duration::from_secs(5)))
            .resolve(InventoryKind::OrganizationProvider, &[])
            .await;
        assert_eq!(
            lookup.notice.as_deref(),
            Some("Could not load OrganizationProvider options: inventory lookup timed out after 50ms")
        );
    }

    #[test]
    fn select_by_label_or_id() {
        let mut field = SelectField::default();
        field.apply(OptionLookup::loaded(vec![
            SelectOption::new("Amsterdam", "metro-1"),
            SelectOption::new("Frankfurt", "metro-2"),
        ]));

        field.select("metro-2");
        assert_eq!(field.value(), "Frankfurt");
        assert_eq!(field.validate("Location"), None);

        field.select("Paris");
        assert_eq!(field.validate("Location"), Some("Location is required.".to_string()));

        field.clear();
        assert_eq!(field.validate("Location"), Some("Location is required.".to_string()));
    }

    #[test]
    fn unavailable_field_blocks_with_required_message() {
        let mut field = SelectField::default();
        field.apply(OptionLookup::unavailable(
            InventoryKind::LocationBuilding,
            &OptionSourceError::Unreachable("dns".to_string()),
        ));
        field.select("Building A");

        assert!(field.unavailable);
        assert_eq!(field.validate("Location"), Some("Location is required.".to_string()));
    }

    #[test]
    fn reloading_drops_choice_no_longer_offered() {
        let mut field = SelectField::default();
        field.apply(OptionLookup::loaded(vec![SelectOption::new("AMS-1", "b1")]));
        field.select("AMS-1");
        field.apply(OptionLookup::loaded(vec![SelectOption::new("FRA-2", "b2")]));
        assert_eq!(field.selected, None);
    }
}
