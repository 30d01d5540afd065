//! Help, navigation and metrics endpoints.

use crate::error::AppError;
use crate::extractors::ApiPath;
use crate::help::HelpError;
use crate::navigation::Navigation;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;

/// `GET /api/help/:topic` body
#[derive(Debug, Serialize)]
pub struct HelpContent {
    /// Requested topic
    pub topic: String,
    /// Markdown
    pub content: String,
}

/// `GET /api/help/:topic`
///
/// # Errors
///
/// `400` for malformed topic names, `404` for missing topics and `500` when
/// the file cannot be read.
pub async fn help_topic(
    State(state): State<AppState>,
    ApiPath(topic): ApiPath<String>,
) -> WebResult<Json<HelpContent>> {
    match state.help.load(&topic).await {
        Ok(content) => Ok(Json(HelpContent { topic, content })),
        Err(e @ HelpError::InvalidTopic(_)) => Err(AppError::bad_request(e.to_string())),
        Err(e @ HelpError::NotFound(_)) => Err(AppError::new(
            StatusCode::NOT_FOUND,
            e.to_string(),
            "NOT_FOUND".to_string(),
        )),
        Err(e @ HelpError::Read(_)) => Err(AppError::internal(e.to_string())),
    }
}

/// `GET /api/navigation`
#[allow(clippy::unused_async)]
pub async fn navigation() -> Json<Navigation> {
    Json(Navigation::portal())
}

/// `GET /metrics` in Prometheus text format.
///
/// # Errors
///
/// `503` when no recorder is installed.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let metrics = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Metrics recorder not installed"))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    ))
}
