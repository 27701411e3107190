//! Deploy Gateway - Main Application Entry Point
//!
//! REST API server that lets users deploy hosted models, buy credits and invoke their
//! deployments through a metered, API-key-authenticated gateway.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: session tokens (HS256) for the dashboard, per-deployment API keys for invocations
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Build the upstream and payment providers
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use std::sync::Arc;

use deploy_gateway::{
    AppState, config::Config, create_router, db, payment_providers, store::PgStore, upstream,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        upstream = ?config.upstream_provider,
        payments = ?config.payment_provider,
        "Configuration loaded"
    );

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let upstream = upstream::create_provider(&config)?;
    let payments = payment_providers::create_provider(&config)?;
    let api_base_url = Url::parse(&config.api_base_url)?;

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        upstream,
        payments,
        api_base_url,
        &config.jwt_secret,
    );
    let app = create_router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
