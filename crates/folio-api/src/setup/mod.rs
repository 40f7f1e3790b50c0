//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::auth::JwtVerifier;
use crate::services::media::MediaService;
use crate::state::AppState;
use anyhow::{Context, Result};
use folio_core::Config;
use folio_worker::JobFinishedSender;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment())?;

    tracing::info!("Configuration loaded and validated successfully");

    let state = build_state(config.clone(), None).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Build shared state: both storage roots, the derivative queue and the token verifier.
///
/// `job_finished_tx` observes background derivative jobs.
pub async fn build_state(
    config: Config,
    job_finished_tx: Option<JobFinishedSender>,
) -> Result<Arc<AppState>> {
    let media = MediaService::new(config.media().clone(), config.worker(), job_finished_tx)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize media storage: {}", e))?;

    let verifier = JwtVerifier::new(config.auth());
    if !verifier.is_configured() {
        tracing::warn!("AUTH_JWT_SECRET not set; admin endpoints will answer 501");
    }

    Ok(Arc::new(AppState {
        config,
        media: Arc::new(media),
        verifier: Arc::new(verifier),
    }))
}
