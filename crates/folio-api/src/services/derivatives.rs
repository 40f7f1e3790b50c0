//! Bridge between the derivative queue and the synchronous generator.

use anyhow::Result;
use async_trait::async_trait;
use folio_core::{AppError, DerivativeSet};
use folio_processing::DerivativeGenerator;
use folio_worker::DerivativeJobContext;
use std::sync::Arc;

/// Run the generator on the blocking pool.
pub async fn run_generator(
    generator: Arc<DerivativeGenerator>,
    rel: String,
) -> Result<DerivativeSet, AppError> {
    let set = tokio::task::spawn_blocking(move || generator.generate(&rel))
        .await
        .map_err(|e| AppError::Internal(format!("Derivative task panicked: {}", e)))??;
    Ok(set)
}

pub struct DerivativeJobs {
    generator: Arc<DerivativeGenerator>,
}

impl DerivativeJobs {
    pub fn new(generator: Arc<DerivativeGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DerivativeJobContext for DerivativeJobs {
    async fn run_derivative_job(self: Arc<Self>, rel: &str) -> Result<DerivativeSet> {
        run_generator(self.generator.clone(), rel.to_string())
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}
