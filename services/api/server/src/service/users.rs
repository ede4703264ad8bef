use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::password::{HashError, PasswordHasher};
use crate::domain::user::{
    NewUserAccount, UserProfile, UserRole, credentials_present,
};
use crate::store::{SessionStore, StoreError, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Registration input is missing a name or password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Login failed. Unknown names and wrong passwords look the same.
    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("User `{0}` already exists")]
    UserAlreadyExists(String),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] HashError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    session_ttl: Duration,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: PasswordHasher,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn register(
        &self,
        name: &str,
        password: &str,
    ) -> Result<UserProfile, UserError> {
        self.create_account(name, password, UserRole::User).await
    }

    /// Checks the credentials and opens a session.
    pub async fn login(
        &self,
        name: &str,
        password: &str,
    ) -> Result<(UserProfile, Uuid), UserError> {
        if !credentials_present(name, password) {
            return Err(UserError::AuthenticationFailed);
        }

        let Some(account) = self.users.find_by_name(name).await? else {
            self.hasher.burn(password.to_string()).await?;
            return Err(UserError::AuthenticationFailed);
        };

        let matches = self
            .hasher
            .verify(password.to_string(), account.password_hash.clone())
            .await?;
        if !matches {
            return Err(UserError::AuthenticationFailed);
        }

        let profile = account.profile();
        let session_id =
            self.sessions.create(profile.clone(), self.session_ttl).await?;

        tracing::info!(user_id = profile.id, "user logged in");
        Ok((profile, session_id))
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), UserError> {
        self.sessions.remove(session_id).await?;
        Ok(())
    }

    pub async fn authenticate(
        &self,
        session_id: Uuid,
    ) -> Result<Option<UserProfile>, UserError> {
        Ok(self.sessions.get(session_id).await?)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<UserProfile, UserError> {
        self.users
            .find_by_id(id)
            .await?
            .map(|account| account.profile())
            .ok_or(UserError::UserNotFound(id))
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserProfile>, UserError> {
        let accounts = self.users.list().await?;
        Ok(accounts.iter().map(|a| a.profile()).collect())
    }

    /// Creates the configured administrator unless the name is taken.
    /// Returns whether an account was created.
    pub async fn ensure_admin(
        &self,
        name: &str,
        password: &str,
    ) -> Result<bool, UserError> {
        if let Some(existing) = self.users.find_by_name(name).await? {
            if existing.role != UserRole::Admin {
                tracing::warn!(
                    user_id = existing.id,
                    "configured admin name belongs to a non-admin user"
                );
            }
            return Ok(false);
        }

        match self.create_account(name, password, UserRole::Admin).await {
            Ok(_) => Ok(true),
            // Another replica won the race.
            Err(UserError::UserAlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_account(
        &self,
        name: &str,
        password: &str,
        role: UserRole,
    ) -> Result<UserProfile, UserError> {
        if !credentials_present(name, password) {
            return Err(UserError::InvalidCredentials);
        }

        if self.users.find_by_name(name).await?.is_some() {
            return Err(UserError::UserAlreadyExists(name.to_string()));
        }

        let password_hash = self.hasher.hash(password.to_string()).await?;
        let account = self
            .users
            .create(NewUserAccount {
                name: name.to_string(),
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    UserError::UserAlreadyExists(name.to_string())
                }
                other => UserError::Store(other),
            })?;

        tracing::info!(user_id = account.id, role = %account.role, "user created");
        Ok(account.profile())
    }
}
