//! HS256 JWT verification against a shared secret

use folio_core::{AppError, AuthConfig};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;

/// Verifies admin bearer tokens. Without a configured secret every verification
/// fails with [`AppError::AuthNotConfigured`].
#[derive(Clone)]
pub struct JwtVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens minted by the portfolio admin need not carry exp.
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: config
                .jwt_secret
                .as_deref()
                .map(|secret| DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<serde_json::Value, AppError> {
        let key = self.key.as_ref().ok_or_else(|| {
            AppError::AuthNotConfigured("JWT verification not configured".to_string())
        })?;

        let token_data =
            decode::<serde_json::Value>(token, key, &self.validation).map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::Unauthorized("Invalid token issuer".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                        AppError::Unauthorized("Invalid token audience".to_string())
                    }
                    _ => AppError::Unauthorized(format!("Invalid token: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret-for-folio";

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn config(audience: Option<&str>, issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            audience: audience.map(String::from),
            issuer: issuer.map(String::from),
        }
    }

    #[test]
    fn test_not_configured() {
        let verifier = JwtVerifier::new(&AuthConfig::default());
        assert!(!verifier.is_configured());
        assert!(matches!(
            verifier.verify("anything"),
            Err(AppError::AuthNotConfigured(_))
        ));
    }

    #[test]
    fn test_valid_token_without_exp() {
        let verifier = JwtVerifier::new(&config(None, None));
        let claims = verifier.verify(&token(json!({"sub": "admin"}), SECRET)).unwrap();
        assert_eq!(claims["sub"], "admin");
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let verifier = JwtVerifier::new(&config(None, None));
        assert!(matches!(
            verifier.verify(&token(json!({"sub": "admin"}), "other")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_audience_and_issuer_enforced() {
        let verifier = JwtVerifier::new(&config(Some("folio"), Some("studio")));

        let good = token(json!({"sub": "a", "aud": "folio", "iss": "studio"}), SECRET);
        assert!(verifier.verify(&good).is_ok());

        let wrong_aud = token(json!({"sub": "a", "aud": "other", "iss": "studio"}), SECRET);
        assert!(matches!(verifier.verify(&wrong_aud), Err(AppError::Unauthorized(_))));

        let wrong_iss = token(json!({"sub": "a", "aud": "folio", "iss": "else"}), SECRET);
        assert!(matches!(verifier.verify(&wrong_iss), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = JwtVerifier::new(&config(None, None));
        let expired = token(json!({"sub": "a", "exp": 1_000_000_000u64}), SECRET);
        assert!(matches!(verifier.verify(&expired), Err(AppError::Unauthorized(_))));
    }
}
