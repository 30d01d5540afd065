//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Simple health check endpoint.
///
/// Does not look at any dependency.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Liveness probe: the process is serving requests.
///
/// ```text
/// GET /health/live
/// ```
#[allow(clippy::unused_async)]
pub async fn liveness() -> (StatusCode, Json<Liveness>) {
    (StatusCode::OK, Json(Liveness { status: "alive" }))
}

/// `/health/live` body
#[derive(Debug, Serialize)]
pub struct Liveness {
    /// Always `alive`
    pub status: &'static str,
}

/// `/health/ready` body
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Readiness {
    /// `ready` or `unavailable`
    pub status: &'static str,
    /// `disabled`, `connected` or `unreachable`
    pub event_bus: &'static str,
    /// Broker error when unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Readiness probe: the event bus is disabled or its brokers answer.
///
/// # Status Codes
///
/// - 200 OK: bus disabled or connected
/// - 503 Service Unavailable: bus enabled but unreachable
///
/// ```text
/// GET /health/ready
/// ```
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let bus = state.event_bus();
    if !bus.is_enabled() {
        return (
            StatusCode::OK,
            Json(Readiness {
                status: "ready",
                event_bus: "disabled",
                detail: None,
            }),
        );
    }

    match bus.check_connection().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ready",
                event_bus: "connected",
                detail: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Event bus readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                    event_bus: "unreachable",
                    detail: Some(e.to_string()),
                }),
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_liveness() {
        let (status, Json(body)) = liveness().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "alive");
    }
}
