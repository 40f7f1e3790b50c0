use std::io;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    Extension, Json,
};
use folio_core::{AppError, AssetListing, AssetMetadata, DerivativeSet, Encoding, StoredOriginal};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AdminClaims;
use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::state::AppState;
use crate::utils::upload::sanitize_filename;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PrefixQuery {
    /// Restrict the listing to this subdirectory
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RelQuery {
    /// Path of the original relative to the media root
    #[validate(length(min = 1))]
    pub rel: String,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BestQuery {
    #[validate(length(min = 1))]
    pub rel: String,
    /// Largest pixel width the client wants
    #[validate(range(min = 1))]
    pub max_width: u32,
    /// Preferred encoding
    #[serde(default = "default_prefer")]
    #[param(value_type = Option<Encoding>)]
    pub prefer: Encoding,
}

fn default_prefer() -> Encoding {
    Encoding::Avif
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    pub rel: String,
    pub url: String,
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DerivativeParams {
    pub base: String,
    pub widths: Vec<u32>,
    pub quality: u8,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub ok: bool,
    pub file: UploadedFile,
    pub derivatives: DerivativeParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BestResponse {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

/// Upload an original
///
/// Streams the multipart field `file` to the media root and schedules derivative
/// generation in the background. The response does not wait for derivatives.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "media",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Original stored", body = UploadResponse),
        (status = 400, description = "Missing or invalid file field", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 501, description = "Token verification not configured", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(operation = "upload"))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminClaims>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = sanitize_filename(field.file_name().unwrap_or_default())?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);

        let stored: StoredOriginal = state.media.ingest(&filename, reader).await?;
        let settings = state.media.settings();
        tracing::info!(
            rel = %stored.rel,
            size_bytes = stored.size_bytes,
            admin = admin.subject(),
            "Original uploaded"
        );

        return Ok(Json(UploadResponse {
            ok: true,
            file: UploadedFile {
                rel: stored.rel,
                url: stored.url,
                content_type,
            },
            derivatives: DerivativeParams {
                base: settings.deriv_base_url.clone(),
                widths: settings.deriv_widths.clone(),
                quality: settings.deriv_quality,
            },
        }));
    }

    Err(AppError::InvalidInput(
        "No file provided; send a multipart field named 'file'".to_string(),
    )
    .into())
}

/// List originals and derivatives
#[utoipa::path(
    get,
    path = "/api/assets",
    tag = "media",
    params(PrefixQuery),
    responses(
        (status = 200, description = "Relative paths under both roots", body = AssetListing),
        (status = 400, description = "Invalid prefix", body = ErrorResponse)
    )
)]
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<AssetListing>, HttpAppError> {
    let prefix = query.prefix.as_deref().filter(|p| !p.is_empty());
    Ok(Json(state.media.list(prefix).await?))
}

/// Metadata for one original
#[utoipa::path(
    get,
    path = "/api/assets/meta",
    tag = "media",
    params(RelQuery),
    responses(
        (status = 200, description = "Original metadata and derivative links", body = AssetMetadata),
        (status = 404, description = "Original not found", body = ErrorResponse)
    )
)]
pub async fn asset_meta(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<RelQuery>,
) -> Result<Json<AssetMetadata>, HttpAppError> {
    Ok(Json(state.media.metadata(&query.rel).await?))
}

/// Best derivative for a width cap
///
/// Picks the widest derivative not wider than `max_width`, or the narrowest one
/// when all are wider, preferring `prefer` at that width.
#[utoipa::path(
    get,
    path = "/api/assets/best",
    tag = "media",
    params(BestQuery),
    responses(
        (status = 200, description = "URL of the chosen derivative", body = BestResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "No derivative available", body = ErrorResponse)
    )
)]
pub async fn best_derivative(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<BestQuery>,
) -> Result<Json<BestResponse>, HttpAppError> {
    let url = state
        .media
        .best(&query.rel, query.max_width, query.prefer)
        .await?;
    Ok(Json(BestResponse { url }))
}

/// Delete an original and its derivatives
#[utoipa::path(
    delete,
    path = "/api/assets",
    tag = "media",
    params(RelQuery),
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Original not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(rel = %query.rel, operation = "delete"))]
pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminClaims>,
    ValidatedQuery(query): ValidatedQuery<RelQuery>,
) -> Result<Json<OkResponse>, HttpAppError> {
    state.media.delete(&query.rel).await?;
    tracing::debug!(admin = admin.subject(), "Delete requested by admin");
    Ok(Json(OkResponse { ok: true }))
}

/// Regenerate derivatives synchronously
#[utoipa::path(
    post,
    path = "/api/assets/regenerate",
    tag = "media",
    params(RelQuery),
    responses(
        (status = 200, description = "Derivatives written, grouped by encoding", body = DerivativeSet),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Original not found", body = ErrorResponse),
        (status = 422, description = "Original could not be decoded", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip_all, fields(rel = %query.rel, operation = "regenerate"))]
pub async fn regenerate(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminClaims>,
    ValidatedQuery(query): ValidatedQuery<RelQuery>,
) -> Result<Json<DerivativeSet>, HttpAppError> {
    tracing::debug!(admin = admin.subject(), "Regenerating derivatives");
    Ok(Json(state.media.regenerate(&query.rel).await?))
}
