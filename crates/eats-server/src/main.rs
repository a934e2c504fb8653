//! eats-server - Read API over ingested menu data

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use eats_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use eats_server::config::{Config, CorsConfig};
use eats_server::create_router;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so .env values are visible to logging setup.
    let config = Config::load()?;

    let log_config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::builder().file_prefix("eats-server").build()
    });
    init_logging(&log_config)?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        "starting eats server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("failed to establish database connection")?;

    info!("database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("failed to apply database migrations")?;

    let app = create_router(pool)
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin '{}'", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
