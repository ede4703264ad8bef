// The OpenApi derive macro generates code using Iterator::for_each,
// which is disallowed by our clippy config. Allow it at module level.
#![allow(clippy::disallowed_methods)]

use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::auth::session::SESSION_COOKIE;

/// Declares the `SESSION` cookie referenced by the protected paths.
struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}

/// Main OpenAPI documentation for the meter readings API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::meter_api::core::v1::auth::handler::login,
        crate::meter_api::core::v1::auth::handler::logout,
        crate::meter_api::core::v1::users::handler::register,
        crate::meter_api::core::v1::users::handler::get_user,
        crate::meter_api::core::v1::users::handler::list_users,
        crate::meter_api::core::v1::meter_readings::handler::current,
        crate::meter_api::core::v1::meter_readings::handler::submit,
        crate::meter_api::core::v1::meter_readings::handler::history,
        crate::meter_api::core::v1::meter_readings::handler::by_month,
        crate::meter_api::core::v1::meter_readings::handler::history_all,
        crate::meter_api::core::v1::meter_readings::handler::totals,
        crate::meter_api::core::v1::audit::handler::handler,
    ),
    modifiers(&SessionCookieAddon),
    info(
        title = "Meter Readings API",
        version = "1.0.0",
        description = "REST API for submitting utility meter readings and querying their history",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "auth", description = "Form login and logout"),
        (name = "users", description = "Registration and user lookup"),
        (name = "meter-readings", description = "Submitting and querying meter readings"),
        (name = "audit", description = "Request audit log")
    )
)]
pub struct MeterV1ApiDoc;

impl MeterV1ApiDoc {
    pub fn openapi() -> utoipa::openapi::OpenApi {
        <MeterV1ApiDoc as utoipa::OpenApi>::openapi()
    }

    /// Get the OpenAPI document as fixed JSON for OpenAPI 3.0 compatibility
    /// Converts type: ["array", "null"] to type: "array", nullable: true
    pub fn openapi_json() -> serde_json::Value {
        let mut json_value = match serde_json::to_value(Self::openapi()) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize OpenAPI document: {e}");
                return serde_json::Value::Null;
            }
        };

        let fixed_count = Self::fix_nullable_arrays_recursive(&mut json_value);

        if fixed_count > 0 {
            tracing::info!(
                "Fixed {} nullable array type definitions in OpenAPI document",
                fixed_count
            );
        }

        json_value
    }

    fn fix_nullable_arrays_recursive(value: &mut serde_json::Value) -> usize {
        let mut fixed_count = 0;

        match value {
            serde_json::Value::Object(map) => {
                if let Some(serde_json::Value::Array(type_array)) = map.get("type") {
                    let has_array = type_array.iter().any(|v| v == "array");
                    let has_null = type_array.iter().any(|v| v == "null");

                    if has_array && has_null && type_array.len() == 2 {
                        map.insert(
                            "type".to_string(),
                            serde_json::Value::String("array".to_string()),
                        );
                        map.insert(
                            "nullable".to_string(),
                            serde_json::Value::Bool(true),
                        );
                        fixed_count += 1;
                    }
                }

                for val in map.values_mut() {
                    fixed_count += Self::fix_nullable_arrays_recursive(val);
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    fixed_count += Self::fix_nullable_arrays_recursive(item);
                }
            }
            _ => {}
        }

        fixed_count
    }
}
