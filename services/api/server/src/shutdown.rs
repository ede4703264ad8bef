use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tokio::sync::{Mutex, Notify};
use tokio::time::Duration;
use tracing::{error, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ShutdownCoordinator {
    notify: Arc<Notify>,
    shutting_down: AtomicBool,
    inner: Mutex<Option<ShutdownInner>>,
}

/// Pools drained on shutdown. The memory backend has none.
struct ShutdownInner {
    db_pools: Vec<postgres_models::connection::Pool>,
    redis_pool: Option<redis_cache::connection::Pool>,
}

impl ShutdownCoordinator {
    pub fn new(
        db_pools: Vec<postgres_models::connection::Pool>,
        redis_pool: Option<redis_cache::connection::Pool>,
    ) -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            shutting_down: AtomicBool::new(false),
            inner: Mutex::new(Some(ShutdownInner {
                db_pools,
                redis_pool,
            })),
        }
    }

    pub async fn wait_for_shutdown(&self) {
        self.notify.notified().await;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        info!("Initiating graceful shutdown sequence");

        let Some(inner) = self.inner.lock().await.take() else {
            warn!("Shutdown already called");
            return;
        };

        // Stop accepting requests
        self.notify.notify_waiters();

        let mut handles = Vec::with_capacity(inner.db_pools.len() + 1);

        for pool in inner.db_pools {
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(
                    SHUTDOWN_TIMEOUT,
                    postgres_models::connection::shutdown_pool_with_timeout(
                        pool.into(),
                        SHUTDOWN_TIMEOUT,
                    ),
                )
                .await
                {
                    Ok(()) => info!("Database pool shutdown completed"),
                    Err(_) => warn!("Database pool shutdown timed out"),
                }
            }));
        }

        if let Some(pool) = inner.redis_pool {
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(
                    SHUTDOWN_TIMEOUT,
                    redis_cache::connection::shutdown_pool_with_timeout(
                        pool,
                        SHUTDOWN_TIMEOUT,
                    ),
                )
                .await
                {
                    Ok(()) => info!("Redis pool shutdown completed"),
                    Err(_) => warn!("Redis pool shutdown timed out"),
                }
            }));
        }

        futures::future::join_all(handles).await;

        info!("Graceful shutdown sequence complete");
    }
}

pub async fn listen_for_shutdown_signals() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("signal received, starting graceful shutdown");
}
