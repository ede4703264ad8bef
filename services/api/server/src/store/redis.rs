use std::time::Duration;

use async_trait::async_trait;
use redis_cache::json_cache::{CacheError, JsonCache};
use uuid::Uuid;

use super::{SessionStore, StoreError, StoreResult};
use crate::domain::user::UserProfile;

const SESSION_NAMESPACE: &str = "session";

impl From<CacheError> for StoreError {
    fn from(value: CacheError) -> Self {
        match value {
            CacheError::Pool(e) => StoreError::Unavailable(e.to_string()),
            CacheError::Command(e) => StoreError::Unavailable(e.to_string()),
            CacheError::Encoding(e) => StoreError::Query(e.to_string()),
        }
    }
}

/// Sessions as JSON strings under `session:<uuid>`, expired by Redis.
#[derive(Clone)]
pub struct RedisSessionStore {
    cache: JsonCache,
}

impl RedisSessionStore {
    pub fn new(pool: redis_cache::connection::Pool) -> Self {
        Self {
            cache: JsonCache::new(pool, SESSION_NAMESPACE),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user: UserProfile, ttl: Duration) -> StoreResult<Uuid> {
        let session_id = Uuid::new_v4();
        // Redis rejects SETEX with a zero expiry.
        let ttl_seconds = ttl.as_secs().max(1);
        self.cache
            .put(&session_id.to_string(), &user, ttl_seconds)
            .await?;
        Ok(session_id)
    }

    async fn get(&self, session_id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self.cache.get(&session_id.to_string()).await?)
    }

    async fn remove(&self, session_id: Uuid) -> StoreResult<()> {
        let removed = self.cache.remove(&session_id.to_string()).await?;
        if !removed {
            tracing::debug!(%session_id, "session was already gone");
        }
        Ok(())
    }
}
