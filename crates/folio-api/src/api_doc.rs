//! OpenAPI documentation.
//! Handler annotations use the default `/api` prefix; a different configured
//! prefix is substituted into the served document at runtime.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use folio_core::models;

/// Prefix used in handler path annotations (utoipa requires compile-time literals).
const OPENAPI_PATH_PLACEHOLDER: &str = "/api";

fn transform_openapi_paths(spec: &mut utoipa::openapi::OpenApi, api_prefix: &str) {
    if OPENAPI_PATH_PLACEHOLDER == api_prefix {
        return;
    }
    let path_map = std::mem::take(&mut spec.paths.paths);
    for (key, item) in path_map {
        let new_key = if key.starts_with(OPENAPI_PATH_PLACEHOLDER) {
            key.replacen(OPENAPI_PATH_PLACEHOLDER, api_prefix, 1)
        } else {
            key
        };
        spec.paths.paths.insert(new_key, item);
    }
}

/// Returns the OpenAPI document with paths rewritten to the configured API prefix.
pub fn get_openapi_spec(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    transform_openapi_paths(&mut spec, api_prefix);
    spec
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folio Media API",
        version = "0.1.0",
        description = "Upload originals for a photography portfolio, list them, and pick the best-fitting WebP/AVIF derivative for a display width."
    ),
    paths(
        handlers::media::upload,
        handlers::media::list_assets,
        handlers::media::asset_meta,
        handlers::media::best_derivative,
        handlers::media::delete_asset,
        handlers::media::regenerate,
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        models::AssetListing,
        models::AssetMetadata,
        models::DerivativeLink,
        models::DerivativeSet,
        models::Encoding,
        handlers::media::UploadResponse,
        handlers::media::UploadedFile,
        handlers::media::DerivativeParams,
        handlers::media::BestResponse,
        handlers::media::OkResponse,
        handlers::health::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "media", description = "Originals and derivatives"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_prefix() {
        let spec = get_openapi_spec("/v2");
        assert!(spec.paths.paths.contains_key("/v2/assets/best"));
        assert!(spec.paths.paths.contains_key("/health"));
        assert!(!spec.paths.paths.contains_key("/api/assets/best"));
    }

    #[test]
    fn test_default_prefix_is_untouched() {
        let spec = get_openapi_spec("/api");
        assert!(spec.paths.paths.contains_key("/api/upload"));
    }
}
