use folio_core::{AppError, Encoding};
use folio_storage::StorageError;
use thiserror::Error;

/// Derivative processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode {rel}: {message}")]
    Decode { rel: String, message: String },

    #[error("Failed to encode {encoding} derivative: {message}")]
    Encode { encoding: Encoding, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Decode { .. } | ProcessingError::Encode { .. } => {
                AppError::ImageProcessing(err.to_string())
            }
            ProcessingError::Storage(e) => e.into(),
            ProcessingError::Io(e) => AppError::Storage(format!("IO error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_maps_to_image_processing() {
        let app: AppError = ProcessingError::Decode {
            rel: "broken.jpg".to_string(),
            message: "truncated".to_string(),
        }
        .into();
        assert!(matches!(app, AppError::ImageProcessing(ref m) if m.contains("broken.jpg")));
    }

    #[test]
    fn test_storage_not_found_passes_through() {
        let app: AppError = ProcessingError::from(StorageError::NotFound("x.jpg".into())).into();
        assert!(matches!(app, AppError::NotFound(_)));
    }
}
