use crate::auth::jwt::JwtVerifier;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use folio_core::AppError;
use std::sync::Arc;

/// Verified claims of the admin who made the request.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub serde_json::Value);

impl AdminClaims {
    /// The `sub` claim, or `unknown` when the token has none.
    pub fn subject(&self) -> &str {
        self.0.get("sub").and_then(|s| s.as_str()).unwrap_or("unknown")
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Reject requests without a valid admin bearer token.
///
/// Missing or malformed header: 401. No secret configured: 501. Bad token: 401.
pub async fn require_admin(
    State(verifier): State<Arc<JwtVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            tracing::debug!(path = %request.uri().path(), "Missing bearer token");
            return HttpAppError(AppError::Unauthorized("Missing bearer token".to_string()))
                .into_response();
        }
    };

    let claims = match verifier.verify(token) {
        Ok(claims) => claims,
        Err(e) => return HttpAppError(e).into_response(),
    };

    let admin = AdminClaims(claims);
    tracing::debug!(sub = admin.subject(), "Admin authenticated");
    request.extensions_mut().insert(admin);
    next.run(request).await
}
