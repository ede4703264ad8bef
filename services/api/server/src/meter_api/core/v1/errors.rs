use axum::extract::rejection::{FormRejection, PathRejection};
use uuid::Uuid;

use crate::meter_api::error_recorder::IntoMeterV1Error;
use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::shared::extractors::{payload, validations};
use crate::store::StoreError;

pub type HandlerResult<T> = Result<T, MeterV1Error>;

pub(crate) fn store_error_code(e: &StoreError) -> &'static str {
    match e {
        StoreError::Unavailable(_) => "store_unavailable",
        StoreError::Duplicate(_) => "duplicate_entry",
        StoreError::Query(_) => "database_error",
    }
}

/// Backend outages are 503, everything else the store reports is a 500.
pub(crate) fn store_error_to_meter_v1_error(
    e: StoreError,
    request_id: &Uuid,
) -> MeterV1Error {
    let code = store_error_code(&e).to_string();
    match e {
        StoreError::Unavailable(msg) => MeterV1Error::service_unavailable(
            "Service temporarily unavailable".to_string(),
            vec![MeterV1Detail {
                field: None,
                code,
                message: msg,
                suggestion: "Please try again later".to_string(),
            }],
            request_id.to_string(),
        ),
        StoreError::Duplicate(msg) | StoreError::Query(msg) => {
            MeterV1Error::internal_server_error(
                "Database error".to_string(),
                vec![MeterV1Detail {
                    field: None,
                    code,
                    message: msg,
                    suggestion: "Please try again later".to_string(),
                }],
                request_id.to_string(),
            )
        }
    }
}

impl IntoMeterV1Error for StoreError {
    fn error_code(&self) -> &'static str {
        store_error_code(self)
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        store_error_to_meter_v1_error(self, request_id)
    }
}

/// A path segment that did not parse into the handler's parameter type.
pub(crate) struct InvalidPathParam {
    pub code: &'static str,
    pub message: &'static str,
    pub field: &'static str,
    pub suggestion: &'static str,
    pub rejection: PathRejection,
}

impl IntoMeterV1Error for InvalidPathParam {
    fn error_code(&self) -> &'static str {
        self.code
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        MeterV1Error::bad_request(
            self.message.to_string(),
            vec![MeterV1Detail {
                field: Some(self.field.to_string()),
                code: self.code.to_string(),
                message: self.rejection.body_text(),
                suggestion: self.suggestion.to_string(),
            }],
            request_id.to_string(),
        )
    }
}

impl IntoMeterV1Error for payload::PayloadRejection {
    fn error_code(&self) -> &'static str {
        self.error.error_code()
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        self.error.to_meter_v1_error(request_id)
    }
}

impl IntoMeterV1Error for validations::Error {
    fn error_code(&self) -> &'static str {
        match self {
            validations::Error::Validation(..) => "validation_failed",
            validations::Error::Payload(e, _) => e.error_code(),
        }
    }

    fn into_meter_v1_error(self, _request_id: &Uuid) -> MeterV1Error {
        self.to_meter_v1_error()
    }
}

impl IntoMeterV1Error for FormRejection {
    fn error_code(&self) -> &'static str {
        "invalid_form"
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        MeterV1Error::bad_request(
            "Invalid login form".to_string(),
            vec![MeterV1Detail {
                field: Some("request".to_string()),
                code: "invalid_form".to_string(),
                message: self.body_text(),
                suggestion: "Send user_name and password as application/x-www-form-urlencoded"
                    .to_string(),
            }],
            request_id.to_string(),
        )
    }
}
