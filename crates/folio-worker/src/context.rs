//! Job handler context trait
//!
//! The API implements this trait over its derivative generator. The queue calls
//! `run_derivative_job` once per submitted original.

use anyhow::Result;
use async_trait::async_trait;
use folio_core::DerivativeSet;
use std::sync::Arc;

#[async_trait]
pub trait DerivativeJobContext: Send + Sync {
    /// Generate derivatives for the original at `rel` and return what was written.
    async fn run_derivative_job(self: Arc<Self>, rel: &str) -> Result<DerivativeSet>;
}
