use anyhow::Context;
use tracing_subscriber::EnvFilter;

use catalog_api::config::config;
use catalog_api::state::build_hierarchy;
use catalog_api::{app, is_development, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = config();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    tracing::info!("Starting catalog API in {:?} mode", config.environment);
    if is_development!() {
        tracing::warn!("Development mode: CORS allows {:?}", config.security.cors_origins);
    }

    let (hierarchy, db) = build_hierarchy(config)
        .await
        .context("failed to initialise the category store")?;
    let app = app(AppState::new(hierarchy, config.clone()));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Catalog API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(db) = db {
        db.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
