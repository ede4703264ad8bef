use deadpool_redis::Runtime;
use deadpool_redis::redis::AsyncCommands;
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument};

pub type Pool = Arc<deadpool_redis::Pool>;
pub type PooledConnection = deadpool_redis::Connection;

pub const DEFAULT_MAX_SIZE: usize = 50;

pub async fn establish_connection(
    redis_url: String,
    max_size: usize,
) -> Result<Pool, anyhow::Error> {
    let mut cfg = deadpool_redis::Config::from_url(redis_url);
    cfg.pool = Some(deadpool_redis::PoolConfig {
        max_size,
        ..Default::default()
    });
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

    let mut conn = pool.get().await?;
    let _: () = conn.ping().await?;
    info!(max_size, "Connected to Redis");

    Ok(Arc::new(pool))
}

#[instrument(skip(pool))]
pub async fn shutdown_pool_with_timeout(pool: Pool, timeout: Duration) {
    let status = pool.status();
    info!(
        size = status.size,
        available = status.available,
        "Starting graceful Redis connection pool shutdown"
    );

    // Give in-flight commands a short window, bounded by the caller's timeout.
    tokio::time::sleep(timeout.min(Duration::from_millis(100))).await;

    // Idle connections close now, busy ones when they are returned.
    pool.close();

    info!("Redis connection pool closed");
}
