use uuid::Uuid;

use crate::meter_api::core::v1::errors::{
    store_error_code, store_error_to_meter_v1_error,
};
use crate::meter_api::error_recorder::IntoMeterV1Error;
use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::service::users::UserError;

impl IntoMeterV1Error for UserError {
    fn error_code(&self) -> &'static str {
        match self {
            UserError::InvalidCredentials => "invalid_credentials",
            UserError::AuthenticationFailed => "authentication_failed",
            UserError::UserAlreadyExists(_) => "user_already_exists",
            UserError::UserNotFound(_) => "user_not_found",
            UserError::PasswordHash(_) => "password_hash_error",
            UserError::Store(e) => store_error_code(e),
        }
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        let code = self.error_code().to_string();
        let rid = request_id.to_string();

        match self {
            UserError::InvalidCredentials => MeterV1Error::bad_request(
                "Invalid credentials".to_string(),
                vec![MeterV1Detail {
                    field: Some("name".to_string()),
                    code,
                    message: "Name and password must not be empty".to_string(),
                    suggestion: "Provide a non-blank name and a password".to_string(),
                }],
                rid,
            ),
            UserError::AuthenticationFailed => MeterV1Error::unauthorized(
                "Invalid credentials".to_string(),
                vec![MeterV1Detail {
                    field: None,
                    code,
                    message: "Unknown user name or wrong password".to_string(),
                    suggestion: "Check user_name and password".to_string(),
                }],
                rid,
            ),
            UserError::UserAlreadyExists(name) => MeterV1Error::bad_request(
                "User already exists".to_string(),
                vec![MeterV1Detail {
                    field: Some("name".to_string()),
                    code,
                    message: format!("The name `{name}` is taken"),
                    suggestion: "Choose a different name".to_string(),
                }],
                rid,
            ),
            UserError::UserNotFound(id) => MeterV1Error::not_found(
                "User not found".to_string(),
                vec![MeterV1Detail {
                    field: Some("id".to_string()),
                    code,
                    message: format!("No user with id {id}"),
                    suggestion: String::new(),
                }],
                rid,
            ),
            UserError::PasswordHash(e) => MeterV1Error::internal_server_error(
                "Password processing failed".to_string(),
                vec![MeterV1Detail {
                    field: None,
                    code,
                    message: e.to_string(),
                    suggestion: "Please try again later".to_string(),
                }],
                rid,
            ),
            UserError::Store(e) => store_error_to_meter_v1_error(e, request_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use axum::http::StatusCode;

    #[test]
    fn user_errors_map_to_their_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (UserError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (UserError::AuthenticationFailed, StatusCode::UNAUTHORIZED),
            (
                UserError::UserAlreadyExists("alice".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (UserError::UserNotFound(3), StatusCode::NOT_FOUND),
            (
                UserError::Store(StoreError::Unavailable("down".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_meter_v1_error(&id).status_code(), status);
        }
    }

    #[test]
    fn store_errors_keep_the_request_id() {
        let id = Uuid::new_v4();
        let error = UserError::Store(StoreError::Query("boom".to_string()))
            .into_meter_v1_error(&id);
        assert_eq!(error.request_id, id.to_string());
    }
}
