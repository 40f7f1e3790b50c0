//! Route configuration and setup

use crate::api_doc;
use crate::auth::require_admin;
use crate::error;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use folio_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let prefix = config.api_prefix().trim_end_matches('/').to_string();

    let app = Router::new()
        .merge(public_routes(&prefix))
        .merge(admin_routes(&prefix, &state))
        .merge(static_routes(config))
        .layer(middleware::from_fn_with_state(
            config.is_production(),
            error::hide_error_details,
        ))
        // Uploads are bounded by the streaming ingest limit, not by buffering the body.
        .layer(DefaultBodyLimit::disable())
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Read-only endpoints, no authentication
fn public_routes(prefix: &str) -> Router<Arc<AppState>> {
    let openapi = api_doc::get_openapi_spec(prefix);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            &format!("{}/openapi.json", prefix),
            get(move || {
                let spec = openapi.clone();
                async move { Json(spec) }
            }),
        )
        .route(
            &format!("{}/assets/meta", prefix),
            get(handlers::media::asset_meta),
        )
        .route(
            &format!("{}/assets/best", prefix),
            get(handlers::media::best_derivative),
        )
}

/// Mutating endpoints behind the admin bearer token.
///
/// `/assets` serves both the public listing (GET) and the admin delete (DELETE), so
/// the gate is applied per method rather than per router.
fn admin_routes(prefix: &str, state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let admin = middleware::from_fn_with_state(state.verifier.clone(), require_admin);

    Router::new()
        .route(
            &format!("{}/upload", prefix),
            post(handlers::media::upload).route_layer(admin.clone()),
        )
        .route(
            &format!("{}/assets", prefix),
            get(handlers::media::list_assets)
                .merge(delete(handlers::media::delete_asset).route_layer(admin.clone())),
        )
        .route(
            &format!("{}/assets/regenerate", prefix),
            post(handlers::media::regenerate).route_layer(admin),
        )
}

/// Static file serving for both roots, when their base URLs are local paths.
fn static_routes(config: &Config) -> Router<Arc<AppState>> {
    let media = config.media();
    let mut router = Router::new();

    for (base_url, root) in [
        (&media.media_base_url, &media.media_root),
        (&media.deriv_base_url, &media.deriv_root),
    ] {
        let mount = base_url.trim_end_matches('/');
        if mount.starts_with('/') && mount.len() > 1 {
            router = router.nest_service(mount, ServeDir::new(root));
        } else {
            tracing::info!(base_url = %base_url, "Base URL is not a local path; static serving skipped");
        }
    }

    router
}
