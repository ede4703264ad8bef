use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use diesel_async::RunQueryDsl;
use redis_cache::json_cache::JsonCache;
use serde::Serialize;

use crate::AppState;

const POSTGRES_TIMEOUT: Duration = Duration::from_secs(5);
const REDIS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_timed(
        result: Result<Result<(), String>, tokio::time::error::Elapsed>,
        start: Instant,
    ) -> Self {
        let latency_ms = Some(start.elapsed().as_millis() as u64);
        match result {
            Ok(Ok(())) => Self {
                status: HealthStatus::Healthy,
                latency_ms,
                error: None,
            },
            Ok(Err(e)) => Self {
                status: HealthStatus::Unhealthy,
                latency_ms,
                error: Some(e),
            },
            Err(_) => Self {
                status: HealthStatus::Unhealthy,
                latency_ms,
                error: Some("timeout".to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// A backend dependency checked by `/health`.
///
/// An unhealthy critical probe makes the whole service unhealthy; any other
/// failing probe only degrades it.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    fn critical(&self) -> bool;

    async fn check(&self) -> ComponentHealth;
}

pub struct PostgresProbe {
    name: String,
    critical: bool,
    pool: postgres_models::connection::Pool,
}

impl PostgresProbe {
    pub fn new(
        name: impl Into<String>,
        critical: bool,
        pool: postgres_models::connection::Pool,
    ) -> Self {
        Self {
            name: name.into(),
            critical,
            pool,
        }
    }
}

#[async_trait]
impl HealthProbe for PostgresProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn critical(&self) -> bool {
        self.critical
    }

    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();
        let result = tokio::time::timeout(POSTGRES_TIMEOUT, async {
            let mut conn = self.pool.get_owned().await.map_err(|e| e.to_string())?;
            diesel::sql_query("SELECT 1")
                .execute(&mut conn)
                .await
                .map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await;

        ComponentHealth::from_timed(result, start)
    }
}

pub struct RedisProbe {
    cache: JsonCache,
}

impl RedisProbe {
    pub fn new(cache: JsonCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthProbe for RedisProbe {
    fn name(&self) -> &str {
        "redis_main"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn check(&self) -> ComponentHealth {
        let start = Instant::now();
        let result = tokio::time::timeout(REDIS_TIMEOUT, async {
            self.cache.ping().await.map_err(|e| e.to_string())
        })
        .await;

        ComponentHealth::from_timed(result, start)
    }
}

/// Folds probe results into the service status.
pub fn overall_status(
    results: &[(bool, &ComponentHealth)],
    shutting_down: bool,
) -> HealthStatus {
    let critical_unhealthy = shutting_down
        || results
            .iter()
            .any(|(critical, c)| *critical && c.status == HealthStatus::Unhealthy);

    let any_unhealthy = results
        .iter()
        .any(|(_, c)| c.status == HealthStatus::Unhealthy);

    if critical_unhealthy {
        HealthStatus::Unhealthy
    } else if any_unhealthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

pub async fn handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    // Run all probes concurrently
    let checks = futures::future::join_all(state.probes.iter().map(|p| p.check())).await;

    let results: Vec<(bool, &ComponentHealth)> = state
        .probes
        .iter()
        .zip(checks.iter())
        .map(|(p, c)| (p.critical(), c))
        .collect();
    let overall = overall_status(&results, state.shutdown.is_shutting_down());

    let status_code = if overall == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let components = state
        .probes
        .iter()
        .map(|p| p.name().to_string())
        .zip(checks)
        .collect();

    (
        status_code,
        Json(HealthResponse {
            status: overall,
            components,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn component(status: HealthStatus) -> ComponentHealth {
        ComponentHealth {
            status,
            latency_ms: Some(1),
            error: None,
        }
    }

    #[test]
    fn no_probes_is_healthy() {
        assert_eq!(overall_status(&[], false), HealthStatus::Healthy);
    }

    #[test]
    fn shutting_down_is_unhealthy() {
        assert_eq!(overall_status(&[], true), HealthStatus::Unhealthy);
    }

    #[test]
    fn failing_replica_only_degrades() {
        let primary = component(HealthStatus::Healthy);
        let replica = component(HealthStatus::Unhealthy);

        assert_eq!(
            overall_status(&[(true, &primary), (false, &replica)], false),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn failing_critical_probe_is_unhealthy() {
        let primary = component(HealthStatus::Unhealthy);
        assert_eq!(
            overall_status(&[(true, &primary)], false),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn timeouts_are_reported_as_errors() {
        let start = Instant::now();
        let elapsed = tokio::time::timeout(Duration::from_millis(1), std::future::pending::<Result<(), String>>()).await;

        let health = ComponentHealth::from_timed(elapsed, start);
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.error.as_deref(), Some("timeout"));
    }
}
