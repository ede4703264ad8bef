use uuid::Uuid;

use crate::domain::meter_reading::ReadingValidationError;
use crate::meter_api::core::v1::errors::{
    store_error_code, store_error_to_meter_v1_error,
};
use crate::meter_api::error_recorder::IntoMeterV1Error;
use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::service::meter_readings::MeterReadingError;

fn validation_detail(e: &ReadingValidationError) -> MeterV1Detail {
    let (field, code, suggestion) = match e {
        ReadingValidationError::InvalidNumberMeter => (
            "numberMeter".to_string(),
            "invalid_number_meter",
            "Use a meter number without spaces",
        ),
        ReadingValidationError::InvalidMonth(_) => (
            "month".to_string(),
            "invalid_month",
            "Use a month between 1 and 12",
        ),
        ReadingValidationError::EmptyDetails => (
            "detailsList".to_string(),
            "empty_details",
            "Send at least one reading detail",
        ),
        ReadingValidationError::BlankType { index } => (
            format!("detailsList[{index}].type"),
            "blank_type",
            "Name the kind of reading, e.g. gas",
        ),
        ReadingValidationError::InvalidValue { index } => (
            format!("detailsList[{index}].value"),
            "invalid_value",
            "Send a finite value of zero or more",
        ),
    };

    MeterV1Detail {
        field: Some(field),
        code: code.to_string(),
        message: e.to_string(),
        suggestion: suggestion.to_string(),
    }
}

impl IntoMeterV1Error for MeterReadingError {
    fn error_code(&self) -> &'static str {
        match self {
            MeterReadingError::Validation(ReadingValidationError::InvalidMonth(_)) => {
                "invalid_month"
            }
            MeterReadingError::Validation(_) => "invalid_reading",
            MeterReadingError::Forbidden => "forbidden",
            MeterReadingError::Store(e) => store_error_code(e),
        }
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        match self {
            MeterReadingError::Validation(e) => MeterV1Error::bad_request(
                e.to_string(),
                vec![validation_detail(&e)],
                request_id.to_string(),
            ),
            MeterReadingError::Forbidden => MeterV1Error::forbidden(
                "Invalid or unauthorized user".to_string(),
                vec![MeterV1Detail {
                    field: None,
                    code: "forbidden".to_string(),
                    message: "This view is restricted to administrators".to_string(),
                    suggestion: String::new(),
                }],
                request_id.to_string(),
            ),
            MeterReadingError::Store(e) => store_error_to_meter_v1_error(e, request_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_errors_name_the_offending_field() {
        let error = MeterReadingError::Validation(ReadingValidationError::InvalidValue {
            index: 2,
        })
        .into_meter_v1_error(&Uuid::nil());

        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.details[0].field.as_deref(), Some("detailsList[2].value"));
    }

    #[test]
    fn invalid_month_keeps_its_message() {
        let error = MeterReadingError::Validation(ReadingValidationError::InvalidMonth(13));
        assert_eq!(error.error_code(), "invalid_month");

        let error = error.into_meter_v1_error(&Uuid::nil());
        assert_eq!(error.message, "Invalid month");
    }

    #[test]
    fn non_admins_are_forbidden() {
        let error = MeterReadingError::Forbidden.into_meter_v1_error(&Uuid::nil());
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.message, "Invalid or unauthorized user");
    }
}
