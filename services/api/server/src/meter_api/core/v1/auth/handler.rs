use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::{Form, Json};

use crate::AppState;
use crate::auth::session::{
    expired_session_cookie, session_cookie, session_id_from_headers,
};
use crate::meter_api::core::v1::errors::HandlerResult;
use crate::meter_api::core::v1::users::models::UserResponse;
use crate::meter_api::error_recorder::ErrorRecorder;
use crate::shared::extractors::request_id::RequestId;

use super::models::LoginForm;

/// Log in with a form post
///
/// On success the response sets the `SESSION` cookie.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in", body = UserResponse,
            headers(("set-cookie" = String, description = "SESSION cookie"))),
        (status = 400, description = "Malformed or non-form body"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "auth",
)]
#[tracing::instrument(skip_all, name = "auth_login")]
pub async fn login(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    form: Result<Form<LoginForm>, FormRejection>,
) -> HandlerResult<(StatusCode, [(header::HeaderName, String); 1], Json<UserResponse>)> {
    let recorder = ErrorRecorder::new(&state.telemetry, "auth_login", &request_id);

    let Form(form) = form.map_err(|e| recorder.record(e))?;

    let result = state.users.login(&form.user_name, &form.password).await;
    let outcome = if result.is_ok() { "success" } else { "failure" };
    state
        .telemetry
        .maybe_use_metrics(|m| m.logins.with_label_values(&[outcome]).inc());

    let (user, session_id) = result.map_err(|e| recorder.record(e))?;
    let cookie = session_cookie(session_id, state.users.session_ttl());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(user.into()),
    ))
}

/// Log out and expire the session cookie
///
/// Succeeds whether or not a session was present.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Logged out"),
    ),
    tag = "auth",
)]
#[tracing::instrument(skip_all, name = "auth_logout")]
pub async fn logout(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    headers: HeaderMap,
) -> HandlerResult<(StatusCode, [(header::HeaderName, String); 1])> {
    let recorder = ErrorRecorder::new(&state.telemetry, "auth_logout", &request_id);

    if let Some(session_id) = session_id_from_headers(&headers) {
        state
            .users
            .logout(session_id)
            .await
            .map_err(|e| recorder.record(e))?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    ))
}
