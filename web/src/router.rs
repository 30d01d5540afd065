//! Route table of the portal.

use crate::error::AppError;
use crate::handlers::{content, health, sessions};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use tower_http::trace::TraceLayer;

/// Every portal route with tracing and correlation ids applied.
pub fn router(state: AppState) -> Router {
    let sessions = Router::new()
        .route("/", post(sessions::create_session))
        .route("/:id", delete(sessions::delete_session))
        .route("/:id/service", post(sessions::open_service))
        .route("/:id/form", get(sessions::form_view))
        .route("/:id/fields/:field", put(sessions::set_field))
        .route("/:id/selections/:field", put(sessions::set_selection))
        .route("/:id/interfaces", put(sessions::set_interface_count))
        .route("/:id/interfaces/:index", patch(sessions::update_interface))
        .route("/:id/groups", put(sessions::set_group_count))
        .route("/:id/groups/rename", post(sessions::rename_group))
        .route("/:id/submit", post(sessions::submit));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(content::metrics))
        .route("/api/navigation", get(content::navigation))
        .route("/api/help/:topic", get(content::help_topic))
        .nest("/api/sessions", sessions)
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}

#[allow(clippy::unused_async)]
async fn not_found() -> AppError {
    AppError::new(
        axum::http::StatusCode::NOT_FOUND,
        "No such route".to_string(),
        "NOT_FOUND".to_string(),
    )
}
