use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::domain::user::has_role_admin;
use crate::meter_api::core::v1::errors::HandlerResult;
use crate::meter_api::error_recorder::ErrorRecorder;
use crate::shared::extractors::request_id::RequestId;
use crate::shared::extractors::session::AuthenticatedUser;

use super::errors::Error;
use super::models::AuditEntryResponse;

const HANDLER_NAME: &str = "audit_latest";
const LATEST_LIMIT: usize = 100;

/// Latest audit entries, newest first (administrators only)
#[utoipa::path(
    get,
    path = "/audit",
    responses(
        (status = 200, description = "Up to 100 audit entries", body = [AuditEntryResponse]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("session_cookie" = [])),
    tag = "audit",
)]
#[tracing::instrument(skip_all, name = "audit_latest")]
pub async fn handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> HandlerResult<Json<Vec<AuditEntryResponse>>> {
    let recorder = ErrorRecorder::new(&state.telemetry, HANDLER_NAME, &request_id);

    if !has_role_admin(&user) {
        return Err(recorder.record(Error::Forbidden));
    }

    let entries = state
        .audit
        .latest(LATEST_LIMIT)
        .await
        .map_err(|e| recorder.record(Error::Store(e)))?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
