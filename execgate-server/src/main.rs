use anyhow::Context;
use execgate_engine::EngineClient;
use execgate_server::config::Config;
use execgate_server::state::AppState;
use execgate_server::storage::LocalCodeStore;
use execgate_server::store::PgJobStore;
use execgate_server::{api, db};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env if there is one
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "execgate_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Execgate Gateway...");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    tokio::fs::create_dir_all(&config.code_storage_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create code storage directory {}",
                config.code_storage_dir.display()
            )
        })?;

    let engine = EngineClient::new(config.engine_url.clone(), config.engine_timeout);
    tracing::info!("Execution engine at {}", engine.base_url());

    let (state, _dispatcher) = AppState::new(
        &config,
        Arc::new(PgJobStore::new(pool)),
        Arc::new(LocalCodeStore::new(config.code_storage_dir.clone())),
        Arc::new(engine),
    );

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
