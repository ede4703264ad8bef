use anyhow::Context;
use meter_api::health::{HealthProbe, PostgresProbe, RedisProbe};
use meter_api::metrics::ServerMetrics;
use meter_api::shutdown::{ShutdownCoordinator, listen_for_shutdown_signals};
use meter_api::{AppState, Config, StorageBackend, Stores};
use postgres_models::connection::PoolSettings;
use redis_cache::json_cache::JsonCache;
use std::sync::Arc;
use telemetry::metrics::Telemetry;

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!("./../../../db/migrations");

fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to build tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        if let Err(e) = setup(config).await {
            tracing::error!("Fatal error during setup: {e:#}");
            std::process::exit(1);
        }
    });
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_new(&config.rust_log)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize tracing filter")?;

    if config.log_format != "pretty" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_target(true)
            .with_level(true)
            .json();
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .pretty();
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    };

    Ok(())
}

struct Backend {
    stores: Stores,
    probes: Vec<Arc<dyn HealthProbe>>,
    shutdown: Arc<ShutdownCoordinator>,
}

async fn connect_postgres_backend(config: &Config) -> anyhow::Result<Backend> {
    let db_creds = config
        .database_credentials()
        .context("DATABASE_CREDENTIALS must be a JSON object with username and password")?;

    let db_rw_url =
        db_creds.database_url(&config.database_rw_endpoint, &config.database_name);
    let db_ro_url =
        db_creds.database_url(config.read_only_endpoint(), &config.database_name);

    let db_pool = postgres_models::connection::establish_connection(
        db_rw_url,
        PoolSettings::default(),
    )
    .await
    .context("Failed to connect to Postgres (read-write)")?;

    let db_pool_conn = db_pool
        .get_owned()
        .await
        .context("Failed to get connection from pool for migrations")?;

    postgres_models::connection::run_migrations(db_pool_conn, MIGRATIONS)
        .await
        .context("Failed to run database migrations")?;

    let read_only_pool = postgres_models::connection::establish_connection(
        db_ro_url,
        PoolSettings::default(),
    )
    .await
    .context("Failed to connect to Postgres (read-only)")?;

    let redis_pool = redis_cache::connection::establish_connection(
        config.redis_url.clone(),
        redis_cache::connection::DEFAULT_MAX_SIZE,
    )
    .await
    .context("Failed to connect to Redis")?;

    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(PostgresProbe::new("postgres_rw", true, db_pool.clone())),
        Arc::new(PostgresProbe::new(
            "postgres_ro",
            false,
            read_only_pool.clone(),
        )),
        Arc::new(RedisProbe::new(JsonCache::new(redis_pool.clone(), "health"))),
    ];

    let shutdown = Arc::new(ShutdownCoordinator::new(
        vec![db_pool.clone(), read_only_pool.clone()],
        Some(redis_pool.clone()),
    ));

    Ok(Backend {
        stores: Stores::postgres(db_pool, read_only_pool, redis_pool),
        probes,
        shutdown,
    })
}

async fn setup(config: Config) -> anyhow::Result<()> {
    init_tracing(&config)?;

    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let addr: String = format!("0.0.0.0:{}", config.api_service_port);
    tracing::info!(
        version = meter_api::VERSION.unwrap_or("unknown"),
        backend = ?config.storage_backend,
        "Starting meter-api service at: {addr}"
    );

    let backend = match config.storage_backend {
        StorageBackend::Postgres => connect_postgres_backend(&config).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Backend {
                stores: Stores::in_memory(),
                probes: Vec::new(),
                shutdown: Arc::new(ShutdownCoordinator::new(Vec::new(), None)),
            }
        }
    };

    // Initialize global prom telemetry
    let metrics =
        ServerMetrics::new(None).context("Failed to create server metrics")?;
    let telemetry = Telemetry::new(Some(metrics));
    telemetry.start().context("Failed to start telemetry")?;
    tracing::info!("Initialized telemetry");

    let shutdown = backend.shutdown.clone();
    let app_state =
        AppState::new(config, backend.stores, telemetry.clone(), shutdown.clone())
            .with_probes(backend.probes);

    meter_api::bootstrap::ensure_admin(&app_state.config, &app_state.users).await?;

    let app = meter_api::app(app_state);

    // Spawn shutdown signal handler
    let shutdown_handle = shutdown.clone();
    tokio::spawn(async move {
        listen_for_shutdown_signals().await;
        shutdown_handle.shutdown().await;
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let shutdown_for_serve = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_for_serve.wait_for_shutdown().await
        })
        .await
        .context("Server exited with error")?;

    telemetry.stop();
    Ok(())
}
