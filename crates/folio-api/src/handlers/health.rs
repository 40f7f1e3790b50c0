use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub media_root: bool,
    pub deriv_root: bool,
}

/// Liveness plus a check that both storage roots are present
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let settings = state.media.settings();
    let media_root = tokio::fs::metadata(&settings.media_root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    let deriv_root = tokio::fs::metadata(&settings.deriv_root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    Json(HealthResponse {
        status: if media_root && deriv_root { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        media_root,
        deriv_root,
    })
}
