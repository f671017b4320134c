mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod error;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Config, ProviderKind};
use crate::routes::sizing_routes::app;
use crate::services::feedback_service::{
    drain_worker, FeedbackQueue, FeedbackTransport, LogFeedbackTransport, RetryPolicy, SmtpFeedbackTransport,
};
use crate::services::sizing_service::SizingService;
use crate::services::sunshine_service::{OpenMeteoSunshineProvider, StaticSunshineTable, SunshineProvider};
use crate::shared_state::AppState;

const FEEDBACK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    // 1. Load configuration
    let config = Config::load_default()?;
    info!(
        provider = ?config.sunshine.provider,
        regions = config.regions.len(),
        panel_overrides = config.panels.len(),
        "configuration loaded"
    );

    // 2. Lookup tables and sunshine source
    let catalog = Arc::new(config.panel_catalog()?);
    let provider: Arc<dyn SunshineProvider> = match config.sunshine.provider {
        ProviderKind::Static => Arc::new(StaticSunshineTable::new(config.regions.clone())),
        ProviderKind::OpenMeteo => Arc::new(
            OpenMeteoSunshineProvider::new(&config.sunshine).context("failed to build HTTP client")?,
        ),
    };

    // 3. Feedback delivery worker
    let transport: Arc<dyn FeedbackTransport> = if config.feedback.enabled {
        Arc::new(SmtpFeedbackTransport::new(&config.feedback)?)
    } else {
        warn!("feedback email disabled, messages will only be logged");
        Arc::new(LogFeedbackTransport)
    };
    let (feedback, feedback_worker) = FeedbackQueue::start(
        transport,
        config.feedback.queue_capacity,
        RetryPolicy::from_config(&config.feedback),
    );

    let state = AppState::new(SizingService::new(provider, catalog), Arc::new(feedback));

    // 4. Start Axum HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    let handle: axum_server::Handle<SocketAddr> = axum_server::Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    axum_server::bind(addr)
        .handle(handle)
        .serve(app(state).into_make_service())
        .await
        .context("HTTP server failed")?;

    // 5. The router held the last queue handle; let queued feedback go out
    if drain_worker(feedback_worker, FEEDBACK_DRAIN_TIMEOUT).await {
        info!("feedback backlog drained");
    }

    warn!("shutdown complete");
    Ok(())
}

async fn shutdown_on_signal(handle: axum_server::Handle<SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    info!("shutdown signal received");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
