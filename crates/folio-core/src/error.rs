//! Service-wide error taxonomy.
//!
//! Storage and processing failures are folded into [`AppError`] at crate
//! boundaries. Presentation (status, code, retry hint, log level) is described
//! by [`ErrorMetadata`] so the HTTP layer renders every variant the same way.

use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected client mistakes
    Debug,
    Warn,
    Error,
}

/// How an error is presented to clients and logs.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable machine-readable code, e.g. `NOT_FOUND`
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to clients
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their details (paths, OS errors)
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication not configured: {0}")]
    AuthNotConfigured(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Presentation of one variant.
struct Presentation {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const fn client_fault(status: u16, code: &'static str, action: &'static str) -> Presentation {
    Presentation {
        status,
        code,
        recoverable: false,
        action: Some(action),
        sensitive: false,
        level: LogLevel::Debug,
    }
}

const fn server_fault(code: &'static str) -> Presentation {
    Presentation {
        status: 500,
        code,
        recoverable: true,
        action: Some("Retry after a short delay"),
        sensitive: true,
        level: LogLevel::Error,
    }
}

impl AppError {
    fn presentation(&self) -> Presentation {
        match self {
            AppError::NotFound(_) => {
                client_fault(404, "NOT_FOUND", "Verify the relative path exists")
            }
            AppError::PayloadTooLarge(_) => client_fault(
                413,
                "PAYLOAD_TOO_LARGE",
                "Reduce file size below the upload limit",
            ),
            AppError::InvalidInput(_) => client_fault(
                400,
                "INVALID_INPUT",
                "Check request parameters and try again",
            ),
            AppError::Unauthorized(_) => {
                client_fault(401, "UNAUTHORIZED", "Provide a valid bearer token")
            }
            AppError::ImageProcessing(_) => Presentation {
                level: LogLevel::Warn,
                ..client_fault(
                    422,
                    "IMAGE_PROCESSING_ERROR",
                    "Check the image format or upload a different file",
                )
            },
            AppError::AuthNotConfigured(_) => Presentation {
                level: LogLevel::Warn,
                ..client_fault(
                    501,
                    "AUTH_NOT_CONFIGURED",
                    "Set AUTH_JWT_SECRET on the server",
                )
            },
            AppError::Storage(_) => server_fault("STORAGE_ERROR"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                server_fault("INTERNAL_ERROR")
            }
        }
    }

    /// Variant name, shown alongside details outside production
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::AuthNotConfigured(_) => "AuthNotConfigured",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `Caused by:` lines from the source chain.
    pub fn detailed_message(&self) -> String {
        const MAX_DEPTH: usize = 5;

        let chain: Vec<String> = std::iter::successors(std::error::Error::source(self), |e| {
            e.source()
        })
        .map(|e| e.to_string())
        .collect();

        let mut details = self.to_string();
        for cause in chain.iter().take(MAX_DEPTH) {
            details.push_str("\n  Caused by: ");
            details.push_str(cause);
        }
        if chain.len() > MAX_DEPTH {
            details.push_str("\n  ... (truncated)");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.presentation().status
    }

    fn error_code(&self) -> &'static str {
        self.presentation().code
    }

    fn is_recoverable(&self) -> bool {
        self.presentation().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.presentation().action
    }

    fn is_sensitive(&self) -> bool {
        self.presentation().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.presentation().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::InvalidInput(msg)
            | AppError::ImageProcessing(msg)
            | AppError::Unauthorized(msg)
            | AppError::AuthNotConfigured(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_faults_are_not_sensitive() {
        let cases = [
            (AppError::NotFound("gone.jpg".into()), 404, "NOT_FOUND"),
            (AppError::PayloadTooLarge("too big".into()), 413, "PAYLOAD_TOO_LARGE"),
            (AppError::InvalidInput("bad rel".into()), 400, "INVALID_INPUT"),
            (AppError::Unauthorized("no token".into()), 401, "UNAUTHORIZED"),
            (AppError::ImageProcessing("corrupt".into()), 422, "IMAGE_PROCESSING_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.http_status_code(), status);
            assert_eq!(err.error_code(), code);
            assert!(!err.is_sensitive());
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_client_message_passes_through() {
        let err = AppError::NotFound("Not found: a/b.jpg".to_string());
        assert_eq!(err.client_message(), "Not found: a/b.jpg");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_storage_hides_details() {
        let err = AppError::Storage("/var/lib/folio/media: permission denied".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_auth_not_configured_is_501() {
        let err = AppError::AuthNotConfigured("JWT verification not configured".to_string());
        assert_eq!(err.http_status_code(), 501);
        assert_eq!(err.error_code(), "AUTH_NOT_CONFIGURED");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_detailed_message_walks_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("write failed"));
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error: write failed"));
        assert!(details.contains("Caused by: disk full"));
    }

    #[test]
    fn test_io_error_is_storage() {
        let err: AppError = io::Error::other("boom").into();
        assert!(matches!(err, AppError::Storage(ref msg) if msg.contains("boom")));
    }
}
