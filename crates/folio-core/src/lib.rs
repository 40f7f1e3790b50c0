//! Folio Core Library
//!
//! This crate provides the configuration, error types and domain models shared
//! by the storage, processing, worker and API crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{AuthConfig, BaseConfig, Config, MediaSettings, WorkerSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AssetListing, AssetMetadata, DerivativeDescriptor, DerivativeLink, DerivativeSet, Encoding,
    StoredOriginal,
};
