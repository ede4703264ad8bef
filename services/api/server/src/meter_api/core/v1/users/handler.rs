use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::meter_api::core::v1::errors::{HandlerResult, InvalidPathParam};
use crate::meter_api::error_recorder::ErrorRecorder;
use crate::shared::extractors::payload::{Payload, PayloadRejection};
use crate::shared::extractors::request_id::RequestId;

use super::models::{RegisterRequest, UserResponse};

/// Register a new user
///
/// New accounts always get the `USER` role.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid credentials or name already taken"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users",
)]
#[tracing::instrument(skip_all, name = "users_register")]
pub async fn register(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Payload<RegisterRequest>, PayloadRejection>,
) -> HandlerResult<(StatusCode, Json<UserResponse>)> {
    let recorder = ErrorRecorder::new(&state.telemetry, "users_register", &request_id);

    let Payload(payload) = payload.map_err(|e| recorder.record(e))?;
    tracing::info!(name = %payload.name, request_id = %request_id, "Register request");

    let user = state
        .users
        .register(&payload.name, &payload.password)
        .await
        .map_err(|e| recorder.record(e))?;

    state
        .telemetry
        .maybe_use_metrics(|m| m.users_registered.inc());

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Look up a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 400, description = "Id is not a number"),
        (status = 404, description = "No such user"),
    ),
    tag = "users",
)]
#[tracing::instrument(skip_all, name = "users_get")]
pub async fn get_user(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    id: Result<Path<i64>, PathRejection>,
) -> HandlerResult<Json<UserResponse>> {
    let recorder = ErrorRecorder::new(&state.telemetry, "users_get", &request_id);

    let Path(id) = id.map_err(|rejection| {
        recorder.record(InvalidPathParam {
            code: "invalid_path",
            message: "Invalid user id",
            field: "id",
            suggestion: "Use a numeric user id",
            rejection,
        })
    })?;

    let user = state
        .users
        .get_user_by_id(id)
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(user.into()))
}

/// List all users, ordered by id
#[utoipa::path(
    get,
    path = "/users/all",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "users",
)]
#[tracing::instrument(skip_all, name = "users_list")]
pub async fn list_users(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> HandlerResult<Json<Vec<UserResponse>>> {
    let recorder = ErrorRecorder::new(&state.telemetry, "users_list", &request_id);

    let users = state
        .users
        .get_all_users()
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
