use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::{UserProfile, UserRole};

/// Missing fields count as empty and are rejected as invalid credentials.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[schema(example = "alice")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
}

impl From<UserProfile> for UserResponse {
    fn from(value: UserProfile) -> Self {
        Self {
            id: value.id,
            name: value.name,
            role: value.role,
        }
    }
}
