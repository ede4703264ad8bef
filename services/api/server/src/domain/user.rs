use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    derive_more::Display,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[display("USER")]
    User,
    #[display("ADMIN")]
    Admin,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown user role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A stored account, including its password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl UserAccount {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// The public face of a user. This is what sessions hold and what the API
/// returns; it never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
}

pub fn has_role_admin(user: &UserProfile) -> bool {
    user.role == UserRole::Admin
}

/// Both fields must be present. A name made only of whitespace counts as
/// missing, a password is taken as-is.
pub fn credentials_present(name: &str, password: &str) -> bool {
    !name.trim().is_empty() && !password.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: UserRole) -> UserProfile {
        UserProfile {
            id: 1,
            name: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!("USER".parse::<UserRole>(), Ok(UserRole::User));
        assert_eq!(
            "root".parse::<UserRole>(),
            Err(UnknownRole("root".to_string()))
        );
    }

    #[test]
    fn roles_display_as_stored() {
        assert_eq!(UserRole::Admin.to_string(), "ADMIN");
        assert_eq!(UserRole::User.to_string(), "USER");
    }

    #[test]
    fn only_admins_have_the_admin_role() {
        assert!(has_role_admin(&profile(UserRole::Admin)));
        assert!(!has_role_admin(&profile(UserRole::User)));
    }

    #[test]
    fn blank_names_and_empty_passwords_are_missing_credentials() {
        assert!(credentials_present("alice", "pw"));
        assert!(!credentials_present("", "pw"));
        assert!(!credentials_present("   ", "pw"));
        assert!(!credentials_present("alice", ""));
    }

    #[test]
    fn profile_drops_the_hash() {
        let account = UserAccount {
            id: 7,
            name: "bob".to_string(),
            password_hash: "$2b$04$abc".to_string(),
            role: UserRole::User,
        };
        assert_eq!(
            account.profile(),
            UserProfile {
                id: 7,
                name: "bob".to_string(),
                role: UserRole::User,
            }
        );
    }
}
