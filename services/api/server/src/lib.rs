//! # Meter Readings API Server
//!
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;
use telemetry::metrics::Telemetry;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::auth::password::PasswordHasher;
use crate::health::HealthProbe;
use crate::metrics::ServerMetrics;
use crate::service::meter_readings::MeterReadingService;
use crate::service::users::UserService;
use crate::shutdown::ShutdownCoordinator;
use crate::store::memory::{MemorySessionStore, MemoryStore};
use crate::store::postgres::PostgresStore;
use crate::store::redis::RedisSessionStore;
use crate::store::{AuditStore, MeterReadingStore, SessionStore, UserStore};

pub mod audit;
pub mod auth;
pub mod bootstrap;
pub mod domain;
pub mod health;
mod meter_api;
pub mod metrics;
pub mod service;
pub mod shared;
pub mod shutdown;
pub mod store;

// OpenAPI documentation module
pub mod openapi;

pub use meter_api::core::v1::get_routes as get_meter_api_v1_routes;

pub const VERSION: Option<&str> = option_env!("VERSION");

/// Returns the OpenAPI documentation routes.
/// Includes Swagger UI and OpenAPI JSON document with OpenAPI 3.0 compatibility fixes
pub fn get_openapi_routes() -> Router {
    use axum::routing::get;
    use utoipa_swagger_ui::SwaggerUi;

    // Converts type: ["array", "null"] -> type: "array", nullable: true
    async fn openapi_3_0_handler() -> Json<serde_json::Value> {
        Json(openapi::MeterV1ApiDoc::openapi_json())
    }

    Router::new()
        .without_v07_checks()
        .route("/api-docs/openapi.json", get(openapi_3_0_handler))
        // SwaggerUI serves the native 3.1 document
        .merge(SwaggerUi::new("/swagger-ui").url(
            "/api-docs/openapi-3.1.json",
            openapi::MeterV1ApiDoc::openapi(),
        ))
}

async fn fallback_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested endpoint does not exist",
            "status": 404
        })),
    )
}

async fn version_handler() -> &'static str {
    VERSION.unwrap_or("unknown")
}

/// The full router: operational endpoints, the audited API and its docs.
pub fn app(state: AppState) -> Router {
    use axum::routing::get;

    let api = get_meter_api_v1_routes(state.clone()).route_layer(
        axum::middleware::from_fn_with_state(state.clone(), audit::record),
    );

    Router::new()
        .without_v07_checks()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .with_state(state)
        .route("/version", get(version_handler))
        .merge(api)
        .fallback(fallback_handler)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .merge(get_openapi_routes())
}

/// The storage seams behind one backend.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub readings: Arc<dyn MeterReadingStore>,
    pub audit: Arc<dyn AuditStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = MemoryStore::new();
        Self {
            users: Arc::new(store.clone()),
            readings: Arc::new(store.clone()),
            audit: Arc::new(store),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    pub fn postgres(
        pool: postgres_models::connection::Pool,
        read_only_pool: postgres_models::connection::Pool,
        cache_pool: redis_cache::connection::Pool,
    ) -> Self {
        let store = PostgresStore::new(pool, read_only_pool);
        Self {
            users: Arc::new(store.clone()),
            readings: Arc::new(store.clone()),
            audit: Arc::new(store),
            sessions: Arc::new(RedisSessionStore::new(cache_pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub telemetry: Arc<Telemetry<ServerMetrics>>,
    pub users: UserService,
    pub readings: MeterReadingService,
    pub audit: Arc<dyn AuditStore>,
    pub probes: Arc<[Arc<dyn HealthProbe>]>,
    pub config: Arc<Config>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Stores,
        telemetry: Arc<Telemetry<ServerMetrics>>,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Self {
        let users = UserService::new(
            stores.users,
            stores.sessions,
            PasswordHasher::new(config.bcrypt_cost),
            Duration::from_secs(config.session_ttl_seconds),
        );

        Self {
            telemetry,
            users,
            readings: MeterReadingService::new(stores.readings),
            audit: stores.audit,
            probes: Arc::from(Vec::new()),
            config: Arc::new(config),
            shutdown,
        }
    }

    pub fn with_probes(mut self, probes: Vec<Arc<dyn HealthProbe>>) -> Self {
        self.probes = Arc::from(probes);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

fn default_rust_log() -> String {
    "info".to_string()
}

fn default_database_name() -> String {
    "meters".to_string()
}

fn default_session_ttl_seconds() -> u64 {
    1800
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Work factors the bcrypt crate accepts.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    BcryptCost(u32),
}

#[derive(Clone, Deserialize)]
pub struct Config {
    // Service port
    pub api_service_port: String,

    // Loggers
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
    #[serde(default)]
    pub log_format: String,

    #[serde(default)]
    pub storage_backend: StorageBackend,

    // Db configs
    #[serde(default)]
    pub database_credentials: String,
    #[serde(default)]
    pub database_rw_endpoint: String,
    #[serde(default)]
    pub database_ro_endpoint: String,
    #[serde(default = "default_database_name")]
    pub database_name: String,

    // Redis configs
    #[serde(default)]
    pub redis_url: String,

    // Auth
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (useful when running outside docker-compose)
        match dotenv::dotenv() {
            Ok(path) => eprintln!("Loaded .env from: {}", path.display()),
            Err(e) => eprintln!("dotenv warning: {e}"),
        }

        envy::from_env::<Config>()?.validate()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)?.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCost(self.bcrypt_cost));
        }
        Ok(self)
    }

    pub fn database_credentials(
        &self,
    ) -> Result<postgres_models::connection::Credentials, serde_json::Error> {
        serde_json::from_str(&self.database_credentials)
    }

    /// The read-only endpoint, falling back to the primary when unset.
    pub fn read_only_endpoint(&self) -> &str {
        if self.database_ro_endpoint.is_empty() {
            &self.database_rw_endpoint
        } else {
            &self.database_ro_endpoint
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_the_port_is_set() {
        let config = Config::from_vars(vars(&[("API_SERVICE_PORT", "8080")])).unwrap();

        assert_eq!(config.api_service_port, "8080");
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.database_name, "meters");
        assert_eq!(config.session_ttl_seconds, 1800);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(config.admin_username.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn the_port_is_required() {
        assert!(Config::from_vars(vars(&[("RUST_LOG", "debug")])).is_err());
    }

    #[test]
    fn memory_backend_and_admin_are_read() {
        let config = Config::from_vars(vars(&[
            ("API_SERVICE_PORT", "3000"),
            ("STORAGE_BACKEND", "memory"),
            ("BCRYPT_COST", "4"),
            ("SESSION_TTL_SECONDS", "60"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.session_ttl_seconds, 60);
        assert_eq!(config.admin_username.as_deref(), Some("root"));
        assert_eq!(config.admin_password.as_deref(), Some("secret"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result = Config::from_vars(vars(&[
            ("API_SERVICE_PORT", "3000"),
            ("STORAGE_BACKEND", "sqlite"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_bcrypt_cost_is_rejected() {
        for cost in ["0", "3", "32"] {
            let result = Config::from_vars(vars(&[
                ("API_SERVICE_PORT", "3000"),
                ("BCRYPT_COST", cost),
            ]));
            assert!(
                matches!(result, Err(ConfigError::BcryptCost(_))),
                "{cost}"
            );
        }

        let config = Config::from_vars(vars(&[
            ("API_SERVICE_PORT", "3000"),
            ("BCRYPT_COST", "31"),
        ]))
        .unwrap();
        assert_eq!(config.bcrypt_cost, 31);
    }

    #[test]
    fn database_credentials_are_parsed_from_json() {
        let config = Config::from_vars(vars(&[
            ("API_SERVICE_PORT", "3000"),
            (
                "DATABASE_CREDENTIALS",
                r#"{"username":"meters","password":"pw"}"#,
            ),
            ("DATABASE_RW_ENDPOINT", "db"),
        ]))
        .unwrap();

        let creds = config.database_credentials().unwrap();
        assert_eq!(creds.username, "meters");
        assert_eq!(
            creds.database_url(config.read_only_endpoint(), &config.database_name),
            "postgresql://meters:pw@db:5432/meters"
        );
    }

    #[test]
    fn malformed_credentials_are_an_error() {
        let config = Config::from_vars(vars(&[
            ("API_SERVICE_PORT", "3000"),
            ("DATABASE_CREDENTIALS", "not json"),
        ]))
        .unwrap();
        assert!(config.database_credentials().is_err());
    }
}
