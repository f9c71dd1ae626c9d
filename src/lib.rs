use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod anomaly;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod rate_limit;
pub mod routes;
pub mod service;
pub mod store;
pub mod utils;

use auth::AuthManager;
use config::{Config, DEFAULT_RUST_LOG};
use context::AppContext;
use rate_limit::TokenBucket;
use service::MessageService;
use store::{InMemoryMessageStore, MessageStore, PostgresMessageStore};

/// Select and prepare the message store: Postgres when a database URL is
/// configured, process memory otherwise.
pub async fn build_store(config: &Config) -> Result<Arc<dyn MessageStore>> {
    match config.database.url {
        Some(_) => {
            let store = PostgresMessageStore::connect(&config.database).await?;
            store.ensure_schema().await?;
            info!(table = %config.database.table, "Using PostgreSQL message store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, messages are kept in memory only");
            Ok(Arc::new(InMemoryMessageStore::new()))
        }
    }
}

/// Wire the shared application context around an already prepared store
pub fn build_context(config: Config, store: Arc<dyn MessageStore>) -> Result<Arc<AppContext>> {
    let auth_manager = AuthManager::new(&config.jwt).context("Failed to initialize JWT")?;
    let rate_limiter =
        TokenBucket::from_config(&config.rate_limit).context("Invalid rate limit settings")?;
    let service = MessageService::new(store, config.database.operation_timeout());

    Ok(Arc::new(AppContext::new(
        Arc::new(service),
        Arc::new(auth_manager),
        Arc::new(rate_limiter),
        Arc::new(config),
    )))
}

/// Log filter from RUST_LOG (after `.env` is loaded), defaulting to info
pub fn log_filter() -> EnvFilter {
    dotenvy::dotenv().ok();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_RUST_LOG))
}

/// Startup warnings about the loaded configuration
pub fn warn_on_insecure_config(config: &Config) {
    if config.jwt.uses_dev_secret() {
        tracing::warn!("JWT_SECRET_KEY is not set; tokens are signed with the development secret");
    }
}

/// Load configuration, start the HTTP server and run until a shutdown signal
pub async fn run() -> Result<()> {
    // Subscriber first so configuration warnings are not lost
    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    warn_on_insecure_config(&config);

    info!("=== Chat Service Starting ===");
    info!("Bind address: {}", config.server.bind_address());
    info!("Auth enforced: {}", config.auth_enabled);
    info!(
        "Rate limit: {} req/min, burst {}",
        config.rate_limit.requests_per_minute, config.rate_limit.burst_size
    );

    let bind_address = config.server.bind_address();
    let store = build_store(&config).await?;
    let app_context = build_context(config, store)?;
    let app = routes::create_router(app_context);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;

    info!("Chat Service listening on {}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Failed to start server")?;

    info!("Chat Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
