use serde::Deserialize;
use utoipa::ToSchema;

/// Form login fields. Missing fields are treated as empty.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
}
