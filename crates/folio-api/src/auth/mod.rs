//! Admin authentication: HS256 bearer tokens gate mutating endpoints.

pub mod jwt;
pub mod middleware;

pub use jwt::JwtVerifier;
pub use middleware::{require_admin, AdminClaims};
