use crate::meter_api::meter_error_v1::{MeterV1Detail, MeterV1Error};
use crate::shared::extractors::payload::{self, Payload};
use crate::shared::extractors::request_id::RequestId;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use std::borrow::Cow;
use thiserror::Error;
use uuid::Uuid;

/// ValidatedPayload uses the full request body and therefore should always appear after
/// other extractors that might implement FromRequestParts instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedPayload<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedPayload<T>
where
    T: serde::de::DeserializeOwned + validator::Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Read before the body consumes the request.
        let RequestId(request_id) = RequestId::from_headers(req.headers());

        let value = Payload::<T>::parse(req, state)
            .await
            .map_err(|e| Error::Payload(e, request_id))?;

        match value.validate() {
            Ok(_) => Ok(ValidatedPayload(value)),
            Err(e) => Err(Error::Validation(e, request_id)),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed")]
    Validation(validator::ValidationErrors, Uuid),

    #[error("Payload error")]
    Payload(payload::Error, Uuid),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.to_meter_v1_error().into_response()
    }
}

impl Error {
    pub fn to_meter_v1_error(&self) -> MeterV1Error {
        match self {
            Error::Validation(validation_errors, request_id) => {
                MeterV1Error::bad_request(
                    "Validation failed".to_string(),
                    validation_errors_to_meter_v1_details(validation_errors),
                    request_id.to_string(),
                )
            }
            Error::Payload(payload_err, request_id) => {
                payload_err.to_meter_v1_error(request_id)
            }
        }
    }
}

/// Transforms ValidationErrors into a Vec of formatted error strings.
///
/// Example format: "`detailsList[0].value` failed validation: value must not be negative"
pub fn validation_errors_to_strings(
    errors: &validator::ValidationErrors,
) -> Vec<String> {
    validation_errors_to_meter_v1_details(errors)
        .into_iter()
        .map(|d| {
            format!(
                "`{}` failed validation: {}",
                d.field.unwrap_or_default(),
                d.message
            )
        })
        .collect()
}

fn validation_errors_to_meter_v1_details(
    errors: &validator::ValidationErrors,
) -> Vec<MeterV1Detail> {
    let mut details = Vec::new();
    collect_details_recursive(errors, None, &mut details);

    if details.is_empty() {
        details.push(MeterV1Detail {
            field: Some("request".to_string()),
            code: "validation_failed".to_string(),
            message: "Validation failed".to_string(),
            suggestion: "Check the request parameters and format of the request body"
                .to_string(),
        });
    }

    details
}

/// Walks nested structs and lists, building `parent.field[index]` paths.
fn collect_details_recursive(
    errors: &validator::ValidationErrors,
    parent_path: Option<&str>,
    output: &mut Vec<MeterV1Detail>,
) {
    for (field, kind) in errors.errors() {
        let current_path = match parent_path {
            Some(p) => format!("{p}.{field}"),
            None => field.to_string(),
        };

        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    // Struct-level rules report under `__all__`, name them by code.
                    let field_name = if *field == "__all__" {
                        error.code.to_string()
                    } else {
                        current_path.clone()
                    };
                    let message = error
                        .message
                        .clone()
                        .unwrap_or(Cow::Borrowed("validation failed"));

                    output.push(MeterV1Detail {
                        field: Some(field_name),
                        code: error.code.to_string(),
                        message: message.to_string(),
                        suggestion: "Check the field value and format".to_string(),
                    });
                }
            }
            validator::ValidationErrorsKind::Struct(struct_errors) => {
                collect_details_recursive(
                    struct_errors,
                    Some(&current_path),
                    output,
                );
            }
            validator::ValidationErrorsKind::List(list_errors) => {
                for (index, item_errors) in list_errors {
                    let item_path = format!("{current_path}[{index}]");
                    collect_details_recursive(item_errors, Some(&item_path), output);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Inner {
        #[validate(range(min = 0.0, message = "must not be negative"))]
        value: f64,
    }

    #[derive(Debug, Validate)]
    struct Outer {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(nested)]
        items: Vec<Inner>,
    }

    #[test]
    fn nested_list_errors_carry_their_index() {
        let outer = Outer {
            name: "ok".to_string(),
            items: vec![Inner { value: 1.0 }, Inner { value: -1.0 }],
        };
        let errors = outer.validate().unwrap_err();

        assert_eq!(
            validation_errors_to_strings(&errors),
            vec!["`items[1].value` failed validation: must not be negative".to_string()]
        );
    }

    #[test]
    fn field_errors_keep_their_code() {
        let outer = Outer {
            name: String::new(),
            items: vec![],
        };
        let errors = outer.validate().unwrap_err();
        let details = validation_errors_to_meter_v1_details(&errors);

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field.as_deref(), Some("name"));
        assert_eq!(details[0].code, "length");
    }
}
