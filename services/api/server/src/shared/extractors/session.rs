use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::AppState;
use crate::auth::session::session_id_from_headers;
use crate::domain::user::UserProfile;
use crate::meter_api::error_recorder::{ErrorRecorder, IntoMeterV1Error};
use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::shared::extractors::request_id::RequestId;

const HANDLER_NAME: &str = "authenticate";

/// The user behind the `SESSION` cookie. Rejects with 401 when the cookie
/// is missing or the session is unknown or expired.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserProfile);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = MeterV1Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequestId(request_id) = RequestId::from_headers(&parts.headers);
        let recorder = ErrorRecorder::new(&state.telemetry, HANDLER_NAME, &request_id);

        let Some(session_id) = session_id_from_headers(&parts.headers) else {
            return Err(recorder.record(Unauthenticated));
        };

        match state.users.authenticate(session_id).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => Err(recorder.record(Unauthenticated)),
            Err(e) => Err(recorder.record(e)),
        }
    }
}

/// No live session behind the request.
struct Unauthenticated;

impl IntoMeterV1Error for Unauthenticated {
    fn error_code(&self) -> &'static str {
        "unauthenticated"
    }

    fn into_meter_v1_error(self, request_id: &Uuid) -> MeterV1Error {
        MeterV1Error::unauthorized(
            "Authentication required".to_string(),
            vec![MeterV1Detail {
                field: Some("SESSION".to_string()),
                code: "unauthenticated".to_string(),
                message: "Missing, unknown or expired session".to_string(),
                suggestion: "Log in via POST /login and send the SESSION cookie"
                    .to_string(),
            }],
            request_id.to_string(),
        )
    }
}
