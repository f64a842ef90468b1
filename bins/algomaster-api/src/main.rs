mod handlers;
mod metrics;
mod routes;

use algomaster_common::RunnerConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    /// Server-wide defaults; requests may override the key and runner URL
    pub config: RunnerConfig,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    info!("AlgoMaster API booting...");

    let config = RunnerConfig::from_env()?;
    let http = algomaster_engine::build_http_client(&config)
        .context("Failed to build HTTP client")?;

    info!(
        runner_url = %config.runner_url,
        ai_simulation = config.has_api_key(),
        simulation_model = %config.simulation_model,
        allowed_runner_urls = config.allowed_runner_urls.len(),
        "Runner configured"
    );

    metrics::register();

    let state = Arc::new(AppState { config, http });

    let app = routes::routes().with_state(state);

    let addr = std::env::var("ALGOMASTER_API_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await
        .context("Server error")?;

    Ok(())
}
