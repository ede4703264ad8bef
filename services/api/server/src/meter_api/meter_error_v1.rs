use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The JSON error envelope every API route answers with.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MeterV1Error {
    #[serde(skip)]
    pub(crate) status_code: StatusCode,
    pub(crate) message: String,
    pub(crate) details: Vec<MeterV1Detail>,
    pub(crate) timestamp: String,
    pub(crate) request_id: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct MeterV1Detail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) field: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) suggestion: String,
}

impl MeterV1Error {
    pub fn new(
        status_code: StatusCode,
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self {
            status_code,
            message,
            details,
            timestamp: Utc::now().to_rfc3339(),
            request_id,
        }
    }

    pub fn bad_request(
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, details, request_id)
    }

    pub fn unauthorized(
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, details, request_id)
    }

    pub fn forbidden(
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, details, request_id)
    }

    pub fn not_found(
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, details, request_id)
    }

    pub fn internal_server_error(
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, details, request_id)
    }

    pub fn service_unavailable(
        message: String,
        details: Vec<MeterV1Detail>,
        request_id: String,
    ) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, details, request_id)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl axum::response::IntoResponse for MeterV1Error {
    fn into_response(self) -> axum::response::Response {
        if self.status_code.is_server_error() {
            tracing::error!(error = %self, "request failed");
            sentry::Hub::with_active(|hub| hub.capture_error(&self));
        }

        (self.status_code, axum::Json(self)).into_response()
    }
}

impl std::fmt::Display for MeterV1Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}, {}, {}",
            self.status_code,
            self.message,
            self.request_id,
            self.details
                .iter()
                .map(|d| d.message.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::fmt::Debug for MeterV1Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterV1Error")
            .field("status_code", &self.status_code)
            .field("message", &self.message)
            .field("details", &self.details)
            .field("timestamp", &self.timestamp)
            .field("request_id", &self.request_id)
            .finish()
    }
}

impl std::error::Error for MeterV1Error {}
