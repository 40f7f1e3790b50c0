//! Admin token helpers

use folio_core::AuthConfig;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

pub const TEST_JWT_SECRET: &str = "folio-test-secret-0123456789abcdef";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        audience: None,
        issuer: None,
    }
}

pub fn admin_token() -> String {
    token_with_secret(TEST_JWT_SECRET)
}

pub fn token_with_secret(secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({"sub": "admin"}),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
