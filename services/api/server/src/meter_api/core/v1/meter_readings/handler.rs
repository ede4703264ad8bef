use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::meter_api::core::v1::errors::{HandlerResult, InvalidPathParam};
use crate::meter_api::error_recorder::ErrorRecorder;
use crate::shared::extractors::request_id::RequestId;
use crate::shared::extractors::session::AuthenticatedUser;
use crate::shared::extractors::validations::{self, ValidatedPayload};

use super::models::{MeterReadingResponse, SubmitReadingRequest, TypeTotalResponse};

fn to_responses<T, R: From<T>>(items: Vec<T>) -> Vec<R> {
    items.into_iter().map(R::from).collect()
}

/// Current reading of the logged-in user
///
/// A list holding the user's newest reading, or empty if there is none.
#[utoipa::path(
    get,
    path = "/meter-readings/current",
    responses(
        (status = 200, description = "Zero or one readings", body = [MeterReadingResponse]),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "meter-readings",
)]
#[tracing::instrument(skip_all, name = "meter_readings_current")]
pub async fn current(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> HandlerResult<Json<Vec<MeterReadingResponse>>> {
    let recorder =
        ErrorRecorder::new(&state.telemetry, "meter_readings_current", &request_id);

    let readings = state
        .readings
        .get_current_readings(&user)
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(to_responses(readings)))
}

/// Submit a reading
///
/// The reading is stamped with the server time and owned by the caller.
#[utoipa::path(
    post,
    path = "/meter-readings/submit",
    request_body = SubmitReadingRequest,
    responses(
        (status = 201, description = "Reading stored", body = MeterReadingResponse),
        (status = 400, description = "Invalid meter number or reading details"),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "meter-readings",
)]
#[tracing::instrument(skip_all, name = "meter_readings_submit")]
pub async fn submit(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<ValidatedPayload<SubmitReadingRequest>, validations::Error>,
) -> HandlerResult<(StatusCode, Json<MeterReadingResponse>)> {
    let recorder =
        ErrorRecorder::new(&state.telemetry, "meter_readings_submit", &request_id);

    let ValidatedPayload(payload) = payload.map_err(|e| recorder.record(e))?;
    tracing::info!(
        user_id = user.id,
        number_meter = %payload.number_meter,
        details = payload.details_list.len(),
        request_id = %request_id,
        "Submit reading request",
    );

    let details = payload.details_list.into_iter().map(Into::into).collect();
    let record = state
        .readings
        .submit_reading(&user, payload.number_meter, details)
        .await
        .map_err(|e| recorder.record(e))?;

    state
        .telemetry
        .maybe_use_metrics(|m| m.readings_submitted.inc());

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Reading history of the logged-in user
#[utoipa::path(
    get,
    path = "/meter-readings/history",
    responses(
        (status = 200, description = "All of the user's readings, oldest first", body = [MeterReadingResponse]),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "meter-readings",
)]
#[tracing::instrument(skip_all, name = "meter_readings_history")]
pub async fn history(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> HandlerResult<Json<Vec<MeterReadingResponse>>> {
    let recorder =
        ErrorRecorder::new(&state.telemetry, "meter_readings_history", &request_id);

    let readings = state
        .readings
        .get_readings_history(&user)
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(to_responses(readings)))
}

/// Readings of the logged-in user taken in a calendar month of any year
#[utoipa::path(
    get,
    path = "/meter-readings/month/{month}",
    params(("month" = u32, Path, description = "Month number, 1 to 12")),
    responses(
        (status = 200, description = "Readings from that month", body = [MeterReadingResponse]),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "meter-readings",
)]
#[tracing::instrument(skip_all, name = "meter_readings_month")]
pub async fn by_month(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
    month: Result<Path<u32>, PathRejection>,
) -> HandlerResult<Json<Vec<MeterReadingResponse>>> {
    let recorder =
        ErrorRecorder::new(&state.telemetry, "meter_readings_month", &request_id);

    let Path(month) = month.map_err(|rejection| {
        recorder.record(InvalidPathParam {
            code: "invalid_month",
            message: "Invalid month",
            field: "month",
            suggestion: "Use a month between 1 and 12",
            rejection,
        })
    })?;

    let readings = state
        .readings
        .get_readings_by_month(&user, month)
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(to_responses(readings)))
}

/// Every user's readings (administrators only)
#[utoipa::path(
    get,
    path = "/meter-readings/history/all",
    responses(
        (status = 200, description = "All readings with their owners", body = [MeterReadingResponse]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("session_cookie" = [])),
    tag = "meter-readings",
)]
#[tracing::instrument(skip_all, name = "meter_readings_history_all")]
pub async fn history_all(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> HandlerResult<Json<Vec<MeterReadingResponse>>> {
    let recorder = ErrorRecorder::new(
        &state.telemetry,
        "meter_readings_history_all",
        &request_id,
    );

    let readings = state
        .readings
        .get_all_readings_history(&user)
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(to_responses(readings)))
}

/// Per-type totals over the logged-in user's history
#[utoipa::path(
    get,
    path = "/meter-readings/totals",
    responses(
        (status = 200, description = "Sum of values per reading type", body = [TypeTotalResponse]),
        (status = 401, description = "Not logged in"),
    ),
    security(("session_cookie" = [])),
    tag = "meter-readings",
)]
#[tracing::instrument(skip_all, name = "meter_readings_totals")]
pub async fn totals(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    AuthenticatedUser(user): AuthenticatedUser,
) -> HandlerResult<Json<Vec<TypeTotalResponse>>> {
    let recorder =
        ErrorRecorder::new(&state.telemetry, "meter_readings_totals", &request_id);

    let totals = state
        .readings
        .get_totals_by_type(&user)
        .await
        .map_err(|e| recorder.record(e))?;

    Ok(Json(to_responses(totals)))
}
