//! Biblio Server - library catalog API
//!
//! Loads configuration, builds the in-memory stores and services, then serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::clock::SystemClock,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Fails when the signing secret or API keys are missing
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    tracing::info!("Starting Biblio Server v{}", env!("CARGO_PKG_VERSION"));

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Everything is wired before the listener is bound
    let repository = Repository::in_memory();
    let state = AppState::new(config, repository, Arc::new(SystemClock))
        .context("Failed to initialize application state")?;

    spawn_rate_limit_janitor(&state);

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblio_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically forget callers that have been idle for a whole window
fn spawn_rate_limit_janitor(state: &AppState) {
    let limiter = state.services.rate_limiter.clone();
    let period = limiter
        .window()
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            limiter.purge_idle();
        }
    });
}
