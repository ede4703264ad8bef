//! Storage seams used by the services.
//!
//! Two backends implement these traits: [`postgres`] (with Redis sessions in
//! [`redis`]) for production and [`memory`] for local runs and tests.

pub mod memory;
pub mod postgres;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::audit::AuditEntry;
use crate::domain::meter_reading::{MeterReadingRecord, NewMeterReading};
use crate::domain::user::{NewUserAccount, UserAccount, UserProfile};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or no connection was free.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("storage query failed: {0}")]
    Query(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the name is taken.
    async fn create(&self, user: NewUserAccount) -> StoreResult<UserAccount>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>>;

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<UserAccount>>;

    /// All users ordered by id.
    async fn list(&self) -> StoreResult<Vec<UserAccount>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeterReadingStore: Send + Sync {
    /// Stores a reading and its details atomically.
    async fn create(&self, reading: NewMeterReading) -> StoreResult<MeterReadingRecord>;

    /// The owner's reading with the highest id.
    async fn latest_for_user(
        &self,
        owner: &UserProfile,
    ) -> StoreResult<Option<MeterReadingRecord>>;

    /// The owner's readings ordered by id.
    async fn list_for_user(&self, owner: &UserProfile) -> StoreResult<Vec<MeterReadingRecord>>;

    /// Every reading ordered by id, each with its owner.
    async fn list_all(&self) -> StoreResult<Vec<MeterReadingRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, message: String) -> StoreResult<AuditEntry>;

    /// Newest first.
    async fn latest(&self, limit: usize) -> StoreResult<Vec<AuditEntry>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user: UserProfile, ttl: Duration) -> StoreResult<Uuid>;

    /// `None` for unknown or expired sessions.
    async fn get(&self, session_id: Uuid) -> StoreResult<Option<UserProfile>>;

    async fn remove(&self, session_id: Uuid) -> StoreResult<()>;
}
