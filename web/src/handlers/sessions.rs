//! Form session endpoints.
//!
//! Every edit is sent through the session's store and answered with the
//! resulting [`PortalView`], so clients never track form state themselves.
//!
//! ```text
//! POST   /api/sessions                          -> 201 {session_id}
//! DELETE /api/sessions/:id                      -> 204
//! POST   /api/sessions/:id/service              {service}
//! GET    /api/sessions/:id/form
//! PUT    /api/sessions/:id/fields/:field        {value}
//! PUT    /api/sessions/:id/selections/:field    {value}
//! PUT    /api/sessions/:id/interfaces           {count}
//! PATCH  /api/sessions/:id/interfaces/:index    {name?, speed?, role?, vpc_group?}
//! PUT    /api/sessions/:id/groups               {count}
//! POST   /api/sessions/:id/groups/rename        {old, new}
//! POST   /api/sessions/:id/submit
//! ```

use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, CorrelationId};
use crate::state::{AppState, SessionError};
use axum::{Json, extract::State, http::StatusCode};
use franc_portal_forms::{
    InterfaceRole, InterfaceSpeed, PortalAction, PortalState, PortalView, RowField, SelectKey,
    Service, SubmissionOutcome, SubmissionStatus, TextField,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Heading of a rejected submission.
pub const VALIDATION_FAILED_MESSAGE: &str = "Please fix the following errors before submitting";

/// `POST /api/sessions` response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    /// Id to use in every session route
    pub session_id: Uuid,
}

/// `POST /api/sessions/:id/service` body
#[derive(Debug, Deserialize)]
pub struct OpenServiceBody {
    /// `device_connection`, `datacenter_deployment` or `pop_deployment`
    pub service: String,
}

/// Body carrying one value
#[derive(Debug, Deserialize)]
pub struct ValueBody {
    /// New value
    pub value: String,
}

/// Body carrying a count
#[derive(Debug, Deserialize)]
pub struct CountBody {
    /// New count
    pub count: usize,
}

/// `PATCH /api/sessions/:id/interfaces/:index` body; absent fields are kept
#[derive(Debug, Default, Deserialize)]
pub struct RowPatch {
    /// Interface name
    pub name: Option<String>,
    /// e.g. `10 Gbit`
    pub speed: Option<String>,
    /// `data` or `management`
    pub role: Option<String>,
    /// Group name; empty makes the row standalone
    pub vpc_group: Option<String>,
}

impl RowPatch {
    fn into_fields(self) -> Result<Vec<RowField>, AppError> {
        let mut fields = Vec::new();
        if let Some(name) = self.name {
            fields.push(RowField::Name(name));
        }
        if let Some(speed) = self.speed {
            let speed: InterfaceSpeed = speed.parse().map_err(|e| AppError::bad_request(format!("{e}")))?;
            fields.push(RowField::Speed(speed));
        }
        if let Some(role) = self.role {
            let role: InterfaceRole = role.parse().map_err(|e| AppError::bad_request(format!("{e}")))?;
            fields.push(RowField::Role(role));
        }
        if let Some(group) = self.vpc_group {
            let group = Some(group).filter(|g| !g.trim().is_empty());
            fields.push(RowField::Group(group));
        }
        if fields.is_empty() {
            return Err(AppError::bad_request("Nothing to update"));
        }
        Ok(fields)
    }
}

/// `POST /api/sessions/:id/groups/rename` body
#[derive(Debug, Deserialize)]
pub struct RenameBody {
    /// Current name
    pub old: String,
    /// New name
    pub new: String,
}

/// Run `actions` on session `id` in order and return the resulting view.
///
/// Stops at the first refused input.
async fn dispatch(
    state: &AppState,
    id: Uuid,
    actions: impl IntoIterator<Item = PortalAction>,
) -> Result<Json<PortalView>, AppError> {
    let store = state.sessions.get(id).await?;
    for action in actions {
        store.send(action).await.map_err(|_| SessionError::Closed(id))?;
        if let Some(error) = store.state(|s| s.input_error.clone()).await {
            return Err(error.into());
        }
    }
    Ok(Json(store.state(PortalState::view).await))
}

/// `POST /api/sessions`
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create(state.environment.clone()).await;
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

/// `DELETE /api/sessions/:id`
///
/// # Errors
///
/// `404` for unknown sessions.
pub async fn delete_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/service`: open a blank form and load its options
///
/// # Errors
///
/// `400` for unknown services, `404` for unknown sessions.
pub async fn open_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<OpenServiceBody>,
) -> Result<Json<PortalView>, AppError> {
    let service: Service = body
        .service
        .parse()
        .map_err(|e| AppError::bad_request(format!("{e}")))?;
    dispatch(&state, id, [PortalAction::OpenService { service }]).await
}

/// `GET /api/sessions/:id/form`
///
/// # Errors
///
/// `404` for unknown sessions.
pub async fn form_view(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PortalView>, AppError> {
    dispatch(&state, id, std::iter::empty::<PortalAction>()).await
}

/// `PUT /api/sessions/:id/fields/:field`
///
/// # Errors
///
/// `400` for fields the open form does not have.
pub async fn set_field(
    State(state): State<AppState>,
    ApiPath((id, field)): ApiPath<(Uuid, String)>,
    ApiJson(body): ApiJson<ValueBody>,
) -> Result<Json<PortalView>, AppError> {
    let field: TextField = field.parse().map_err(|e| AppError::bad_request(format!("{e}")))?;
    dispatch(&state, id, [PortalAction::SetText { field, value: body.value }]).await
}

/// `PUT /api/sessions/:id/selections/:field`
///
/// # Errors
///
/// `400` for selections the open form does not have.
pub async fn set_selection(
    State(state): State<AppState>,
    ApiPath((id, field)): ApiPath<(Uuid, String)>,
    ApiJson(body): ApiJson<ValueBody>,
) -> Result<Json<PortalView>, AppError> {
    let key: SelectKey = field.parse().map_err(|e| AppError::bad_request(format!("{e}")))?;
    dispatch(&state, id, [PortalAction::Select { key, value: body.value }]).await
}

/// `PUT /api/sessions/:id/interfaces`
///
/// # Errors
///
/// `400` unless a device connection form is open.
pub async fn set_interface_count(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CountBody>,
) -> Result<Json<PortalView>, AppError> {
    dispatch(&state, id, [PortalAction::SetInterfaceCount { count: body.count }]).await
}

/// `PATCH /api/sessions/:id/interfaces/:index`
///
/// # Errors
///
/// `400` for empty patches and unknown speeds or roles.
pub async fn update_interface(
    State(state): State<AppState>,
    ApiPath((id, index)): ApiPath<(Uuid, usize)>,
    ApiJson(patch): ApiJson<RowPatch>,
) -> Result<Json<PortalView>, AppError> {
    let actions: Vec<_> = patch
        .into_fields()?
        .into_iter()
        .map(|field| PortalAction::UpdateInterface { index, field })
        .collect();
    dispatch(&state, id, actions).await
}

/// `PUT /api/sessions/:id/groups`
///
/// # Errors
///
/// `400` unless a device connection form is open.
pub async fn set_group_count(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CountBody>,
) -> Result<Json<PortalView>, AppError> {
    dispatch(&state, id, [PortalAction::SetGroupCount { count: body.count }]).await
}

/// `POST /api/sessions/:id/groups/rename`
///
/// # Errors
///
/// `400` for unknown groups and blank names.
pub async fn rename_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<RenameBody>,
) -> Result<Json<PortalView>, AppError> {
    dispatch(&state, id, [PortalAction::RenameGroup { old: body.old, new: body.new }]).await
}

/// `POST /api/sessions/:id/submit`
///
/// # Errors
///
/// `422` with every validation message, `502` when the deployment workflow
/// failed, `409` without an open form.
#[tracing::instrument(skip_all, fields(correlation_id = %correlation_id.0, session_id = %id))]
pub async fn submit(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let store = state.sessions.get(id).await?;
    store
        .send(PortalAction::Submit)
        .await
        .map_err(|_| SessionError::Closed(id))?;

    let (status, input_error) = store
        .state(|s| (s.status.clone(), s.input_error.clone()))
        .await;
    if let Some(error) = input_error {
        return Err(error.into());
    }

    match status {
        SubmissionStatus::Accepted(outcome) => Ok(Json(outcome)),
        SubmissionStatus::Rejected { errors, .. } => {
            Err(AppError::validation(VALIDATION_FAILED_MESSAGE).with_errors(errors))
        },
        SubmissionStatus::Failed { message, .. } => Err(AppError::deployment_failed(message)),
        SubmissionStatus::Idle | SubmissionStatus::Deploying | SubmissionStatus::Publishing => {
            Err(AppError::conflict("Submission did not complete"))
        },
    }
}
