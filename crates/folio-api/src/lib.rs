//! Folio API Library
//!
//! HTTP handlers, admin authentication, and application setup for the media service.

mod api_doc;
mod handlers;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use folio_worker::{DerivativeQueue, DerivativeQueueConfig, JobOutcome};
pub use services::media::MediaService;
pub use state::AppState;
