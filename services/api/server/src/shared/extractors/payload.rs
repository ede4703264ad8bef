use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::shared::extractors::request_id::RequestId;

/// JSON body extractor that reports the failing field path.
#[derive(Debug, Clone, Copy, Default)]
#[must_use]
pub struct Payload<T>(pub T);

impl<T> Payload<T>
where
    T: DeserializeOwned,
{
    pub(crate) async fn parse<S>(req: Request, state: &S) -> Result<T, Error>
    where
        S: Send + Sync,
    {
        if !json_content_type(req.headers()) {
            return Err(Error::MissingJsonContentType);
        }

        let bytes = Bytes::from_request(req, state).await?;
        let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
        Ok(serde_path_to_error::deserialize(deserializer)?)
    }
}

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let RequestId(request_id) = RequestId::from_headers(req.headers());

        Self::parse(req, state)
            .await
            .map(Payload)
            .map_err(|error| PayloadRejection { error, request_id })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bytes(#[from] BytesRejection),

    #[error(transparent)]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),

    #[error("missing content-type header")]
    MissingJsonContentType,
}

#[derive(Debug)]
pub struct PayloadRejection {
    pub error: Error,
    pub request_id: Uuid,
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        self.error.to_meter_v1_error(&self.request_id).into_response()
    }
}

impl Error {
    /// Label for the `request_errors` counter.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Json(_) => "invalid_json",
            Error::MissingJsonContentType => "missing_content_type",
            Error::Bytes(_) => "request_body_error",
        }
    }

    /// Field-level details come from the serde_path_to_error path.
    pub fn to_meter_v1_error(&self, request_id: &Uuid) -> MeterV1Error {
        let detail = match self {
            Error::Json(serde_err) => {
                let field_path = serde_err.path().to_string();
                let inner_message = serde_err.inner().to_string();
                let missing = missing_field_from_message(&inner_message);

                if let Some(missing_field) = missing {
                    let field = if field_path.is_empty() || field_path == "." {
                        missing_field.clone()
                    } else {
                        format!("{field_path}.{missing_field}")
                    };
                    MeterV1Detail {
                        field: Some(field),
                        code: "missing_field".to_string(),
                        message: format!("Missing required field: {missing_field}"),
                        suggestion: "Add the field to the request body".to_string(),
                    }
                } else if field_path.is_empty() || field_path == "." {
                    MeterV1Detail {
                        field: Some("request".to_string()),
                        code: "invalid_json".to_string(),
                        message: format!("Invalid JSON: {inner_message}"),
                        suggestion: "Check the request body is valid JSON".to_string(),
                    }
                } else {
                    MeterV1Detail {
                        field: Some(field_path.clone()),
                        code: "invalid_field".to_string(),
                        message: format!(
                            "Invalid value for field '{field_path}': {inner_message}"
                        ),
                        suggestion: "Check the field value and format".to_string(),
                    }
                }
            }
            Error::MissingJsonContentType => MeterV1Detail {
                field: Some("Content-Type".to_string()),
                code: "missing_content_type".to_string(),
                message: "Content-Type header must be application/json".to_string(),
                suggestion: "Set Content-Type header to application/json".to_string(),
            },
            Error::Bytes(_) => MeterV1Detail {
                field: Some("request".to_string()),
                code: "request_body_error".to_string(),
                message: "Unable to read request body".to_string(),
                suggestion: "Check the request body and content length".to_string(),
            },
        };

        MeterV1Error::bad_request(
            "Invalid request payload".to_string(),
            vec![detail],
            request_id.to_string(),
        )
    }
}

/// "missing field `numberMeter` at line 1 column 2" -> "numberMeter"
fn missing_field_from_message(message: &str) -> Option<String> {
    let start = message.find("missing field")?;
    let after = &message[start + "missing field".len()..];
    let open = after.find('`')?;
    let close = after[open + 1..].find('`')?;
    Some(after[open + 1..open + 1 + close].to_string())
}

fn json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return false;
    };

    let Ok(content_type) = content_type.to_str() else {
        return false;
    };

    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };

    mime.type_() == "application"
        && (mime.subtype() == "json"
            || mime.suffix().is_some_and(|name| name == "json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn json_and_json_suffixed_types_are_accepted() {
        for (value, expected) in [
            ("application/json", true),
            ("application/json; charset=utf-8", true),
            ("application/problem+json", true),
            ("text/plain", false),
            ("application/x-www-form-urlencoded", false),
        ] {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
            assert_eq!(json_content_type(&headers), expected, "{value}");
        }

        assert!(!json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn missing_field_names_are_extracted() {
        assert_eq!(
            missing_field_from_message("missing field `numberMeter` at line 1 column 2"),
            Some("numberMeter".to_string())
        );
        assert_eq!(missing_field_from_message("invalid type: string"), None);
    }
}
