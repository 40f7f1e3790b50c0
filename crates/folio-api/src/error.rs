//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything convertible into
//! `AppError` becomes an `HttpAppError` through `?` and renders the same JSON shape.

use axum::{
    extract::rejection::QueryRejection,
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::{AppError, ErrorMetadata, LogLevel};
use folio_processing::ProcessingError;
use folio_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse (orphan rule).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<ProcessingError> for HttpAppError {
    fn from(err: ProcessingError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<QueryRejection> for HttpAppError {
    fn from(rejection: QueryRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid query parameters: {}",
            rejection.body_text()
        )))
    }
}

/// Query extractor that validates with `validator` and reports failures as `ErrorResponse`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(HttpAppError::from)?;
        inner.validate().map_err(AppError::from)?;
        Ok(ValidatedQuery(inner))
    }
}

impl ErrorResponse {
    fn from_app_error(err: &AppError, show_details: bool) -> Self {
        Self {
            error: err.client_message(),
            details: show_details.then(|| err.detailed_message()),
            error_type: show_details.then(|| err.error_type().to_string()),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
        }
    }
}

/// Full error body, attached to responses whose details may be shown.
#[derive(Debug, Clone)]
struct DetailedError(ErrorResponse);

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let kind = err.error_type();
        match err.log_level() {
            LogLevel::Debug => tracing::debug!(error = %err, error_type = kind, %status, "Request failed"),
            LogLevel::Warn => tracing::warn!(error = %err, error_type = kind, %status, "Request failed"),
            LogLevel::Error => tracing::error!(error = ?err, error_type = kind, %status, "Request failed"),
        }

        let show_details = !err.is_sensitive();
        let body = ErrorResponse::from_app_error(&err, show_details);
        let mut response = (status, Json(body.clone())).into_response();
        if show_details {
            response.extensions_mut().insert(DetailedError(body));
        }
        response
    }
}

/// Strips `details` and `error_type` from error bodies when `production` is set.
///
/// Layered on the router with `Config::is_production()` as its state.
pub async fn hide_error_details(
    State(production): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if !production {
        return response;
    }

    match response.extensions_mut().remove::<DetailedError>() {
        Some(DetailedError(mut body)) => {
            body.details = None;
            body.error_type = None;
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Json(body).into_response().into_body())
        }
        None => response,
    }
}
