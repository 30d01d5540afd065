//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the portal components:
//! - Store action and effect processing
//! - Inventory option lookups
//! - Event bus publishing
//! - Submission outcomes per service
//!
//! # Example
//!
//! ```rust,no_run
//! use franc_portal_runtime::metrics::PortalMetrics;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PortalMetrics::install()?;
//!
//! // Served by the web layer at GET /metrics
//! let body = metrics.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Handle to the Prometheus recorder backing `GET /metrics`.
#[derive(Clone)]
pub struct PortalMetrics {
    handle: PrometheusHandle,
}

impl PortalMetrics {
    /// Install the process-wide recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a recorder is already installed.
    /// Call this exactly once, from the server binary.
    pub fn install() -> Result<Self, MetricsError> {
        let handle = builder()?
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();
        tracing::info!("Prometheus recorder installed");
        Ok(Self { handle })
    }

    /// A recorder that is not installed globally.
    ///
    /// Renders only its own (empty) registry; used by tests and by
    /// embedders that install their own recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the exporter cannot be configured.
    pub fn detached() -> Result<Self, MetricsError> {
        let recorder = builder()?.build_recorder();
        Ok(Self {
            handle: recorder.handle(),
        })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PortalMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalMetrics").finish_non_exhaustive()
    }
}

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!(
        "store_actions_processed_total",
        "Total number of actions reduced by session stores"
    );
    describe_counter!(
        "store_effects_executed_total",
        "Total number of effects executed, by effect type"
    );

    // Inventory
    describe_counter!(
        "inventory_lookups_total",
        "Option lookups against the inventory, by kind and outcome"
    );
    describe_histogram!(
        "inventory_lookup_duration_seconds",
        "Time taken to resolve options"
    );

    // Event bus
    describe_counter!(
        "event_bus_messages_published_total",
        "Total number of messages published to the event bus"
    );
    describe_counter!(
        "event_bus_publish_errors_total",
        "Total number of publish errors"
    );
    describe_histogram!(
        "event_bus_publish_duration_seconds",
        "Time taken to publish messages"
    );

    // Submissions
    describe_counter!(
        "portal_submissions_total",
        "Form submissions, by service and outcome"
    );
}

/// Inventory lookup recorder.
pub struct InventoryMetrics;

impl InventoryMetrics {
    /// Record a lookup that returned options.
    pub fn record_success(kind: &'static str, duration: Duration) {
        counter!("inventory_lookups_total", "kind" => kind, "outcome" => "ok").increment(1);
        histogram!("inventory_lookup_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a lookup that degraded to an empty option list.
    pub fn record_failure(kind: &'static str, duration: Duration) {
        counter!("inventory_lookups_total", "kind" => kind, "outcome" => "unavailable")
            .increment(1);
        histogram!("inventory_lookup_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Submission outcome recorder.
pub struct SubmissionMetrics;

impl SubmissionMetrics {
    /// Record a submission that passed validation.
    pub fn record_accepted(service: &'static str) {
        counter!("portal_submissions_total", "service" => service, "outcome" => "accepted")
            .increment(1);
    }

    /// Record a submission rejected by validation.
    pub fn record_rejected(service: &'static str) {
        counter!("portal_submissions_total", "service" => service, "outcome" => "rejected")
            .increment(1);
    }

    /// Record a submission whose deployment workflow failed.
    pub fn record_deployment_failed(service: &'static str) {
        counter!("portal_submissions_total", "service" => service, "outcome" => "deployment_failed")
            .increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn detached_recorder_renders() {
        let metrics = PortalMetrics::detached().unwrap();
        // Nothing recorded into this registry, but rendering must not fail.
        let _ = metrics.render();
        assert!(format!("{metrics:?}").contains("PortalMetrics"));
    }

    #[test]
    fn recorders_are_safe_without_installed_recorder() {
        InventoryMetrics::record_success("LocationMetro", Duration::from_millis(12));
        InventoryMetrics::record_failure("LocationMetro", Duration::from_millis(5000));
        SubmissionMetrics::record_accepted("pop_deployment");
        SubmissionMetrics::record_rejected("pop_deployment");
        SubmissionMetrics::record_deployment_failed("datacenter_deployment");
    }

    #[test]
    fn recorded_values_show_up_in_render() {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            SubmissionMetrics::record_accepted("device_connection");
        });

        let rendered = handle.render();
        assert!(rendered.contains("portal_submissions_total"));
        assert!(rendered.contains("device_connection"));
    }
}
