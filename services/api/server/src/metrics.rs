use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use telemetry::metrics::TelemetryMetrics;

use crate::AppState;

/// Service counters. They live in the service's own registry so several
/// instances can coexist in one process.
#[derive(Clone)]
pub struct ServerMetrics {
    pub registry: Registry,

    pub request_errors: IntCounterVec,
    pub readings_submitted: IntCounter,
    pub users_registered: IntCounter,
    pub logins: IntCounterVec,
}

impl TelemetryMetrics for ServerMetrics {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn metrics(&self) -> Option<Self> {
        Some(self.clone())
    }
}

impl ServerMetrics {
    pub fn new_with_random_prefix() -> anyhow::Result<Self> {
        ServerMetrics::new(Some(ServerMetrics::generate_random_prefix()))
    }

    pub fn new(prefix: Option<String>) -> anyhow::Result<Self> {
        let registry = Registry::new_custom(prefix, None)?;

        let request_errors = IntCounterVec::new(
            Opts::new(
                "request_errors",
                "A metric counting request errors by handler and error code",
            ),
            &["handler", "error_code"],
        )?;
        let readings_submitted = IntCounter::new(
            "readings_submitted",
            "Meter readings stored through the API",
        )?;
        let users_registered =
            IntCounter::new("users_registered", "Users created through /register")?;
        let logins = IntCounterVec::new(
            Opts::new("logins", "Form login attempts by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(request_errors.clone()))?;
        registry.register(Box::new(readings_submitted.clone()))?;
        registry.register(Box::new(users_registered.clone()))?;
        registry.register(Box::new(logins.clone()))?;

        Ok(Self {
            registry,
            request_errors,
            readings_submitted,
            users_registered,
            logins,
        })
    }

    pub fn record_error(&self, handler: &str, error_code: &str) {
        self.request_errors
            .with_label_values(&[handler, error_code])
            .inc();
    }
}

pub async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.telemetry.get_metrics(),
    )
}
