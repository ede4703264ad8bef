//! Namespaced JSON values with an expiry, stored as plain Redis strings.

use deadpool_redis::redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::connection::Pool;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to get Redis connection: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] deadpool_redis::redis::RedisError),

    #[error("Cached value is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct JsonCache {
    pool: Pool,
    namespace: &'static str,
}

impl JsonCache {
    pub fn new(pool: Pool, namespace: &'static str) -> Self {
        Self { pool, namespace }
    }

    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.namespace, id)
    }

    pub async fn put<T: Serialize>(
        &self,
        id: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(self.key(id), json, ttl_seconds).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        id: &str,
    ) -> Result<Option<T>, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(self.key(id)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Returns whether a value was removed.
    pub async fn remove(&self, id: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(self.key(id)).await?;
        Ok(removed > 0)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn.ping().await?;
        Ok(())
    }

    async fn connection(
        &self,
    ) -> Result<deadpool_redis::Connection, CacheError> {
        let conn = self
            .pool
            .get()
            .instrument(tracing::info_span!("acquiring_cache_connection"))
            .await?;
        Ok(conn)
    }
}
