//! Media service: originals on one root, derivatives on the other.
//!
//! Handlers talk to this service only. It owns both storages, the generator and
//! the background queue that runs the generator after every ingest.

use crate::services::derivatives::{run_generator, DerivativeJobs};
use folio_core::{
    AppError, AssetListing, AssetMetadata, DerivativeSet, Encoding, MediaSettings, StoredOriginal,
    WorkerSettings,
};
use folio_processing::{DerivativeCatalog, DerivativeGenerator};
use folio_storage::{normalize_key, LocalStorage};
use folio_worker::{DerivativeQueue, DerivativeQueueConfig, JobFinishedSender};
use std::sync::Arc;
use tokio::io::AsyncRead;

pub struct MediaService {
    settings: MediaSettings,
    originals: LocalStorage,
    derivatives: DerivativeCatalog,
    generator: Arc<DerivativeGenerator>,
    queue: DerivativeQueue,
}

impl MediaService {
    /// Open both roots and start the derivative queue.
    ///
    /// `job_finished_tx` receives `(rel, outcome)` for each background job.
    pub async fn new(
        settings: MediaSettings,
        worker: &WorkerSettings,
        job_finished_tx: Option<JobFinishedSender>,
    ) -> Result<Self, AppError> {
        let originals = LocalStorage::new(&settings.media_root, &settings.media_base_url).await?;
        let derivatives = DerivativeCatalog::new(
            LocalStorage::new(&settings.deriv_root, &settings.deriv_base_url).await?,
        );
        let generator = Arc::new(DerivativeGenerator::new(&settings));

        let queue = DerivativeQueue::new(
            DerivativeQueueConfig::from(worker),
            Arc::new(DerivativeJobs::new(generator.clone())),
            job_finished_tx,
        );

        tracing::info!(
            media_root = %settings.media_root.display(),
            deriv_root = %settings.deriv_root.display(),
            widths = %settings.widths_csv(),
            quality = settings.deriv_quality,
            encodings = ?generator.encodings(),
            "Media service initialized"
        );

        Ok(Self {
            settings,
            originals,
            derivatives,
            generator,
            queue,
        })
    }

    pub fn settings(&self) -> &MediaSettings {
        &self.settings
    }

    /// Stream an upload into the media root and schedule its derivatives.
    ///
    /// The returned original is final; derivative generation happens later and its
    /// outcome is only visible through listings and logs.
    pub async fn ingest<R>(&self, filename: &str, reader: R) -> Result<StoredOriginal, AppError>
    where
        R: AsyncRead + Unpin,
    {
        let stored = self
            .originals
            .ingest(filename, reader, self.settings.max_upload_bytes)
            .await?;

        if let Err(e) = self.queue.submit(&stored.rel) {
            tracing::warn!(rel = %stored.rel, error = %e, "Derivatives not scheduled");
        }

        Ok(stored)
    }

    pub async fn list(&self, prefix: Option<&str>) -> Result<AssetListing, AppError> {
        let originals = self.originals.list(prefix).await?;
        let derivatives = self.derivatives.list(prefix).await?;

        Ok(AssetListing {
            media_base: self.settings.media_base_url.clone(),
            media_deriv_base: self.settings.deriv_base_url.clone(),
            originals,
            derivatives,
        })
    }

    pub async fn metadata(&self, rel: &str) -> Result<AssetMetadata, AppError> {
        let key = normalize_key(rel).map_err(AppError::from)?;
        let stat = self.originals.stat(&key).await?;
        let derivative_details = self.derivatives.links_for(&key).await?;

        Ok(AssetMetadata {
            url: self.originals.generate_url(&key),
            rel: key,
            size: stat.size,
            mime: stat.mime,
            modified_at: stat.modified_at,
            derivatives: derivative_details.iter().map(|d| d.url.clone()).collect(),
            derivative_details,
        })
    }

    /// URL of the best derivative, or `NotFound` when the original has none.
    pub async fn best(&self, rel: &str, max_width: u32, prefer: Encoding) -> Result<String, AppError> {
        let key = normalize_key(rel).map_err(AppError::from)?;
        self.derivatives
            .best_url(&key, max_width, prefer)
            .await?
            .ok_or_else(|| AppError::NotFound("No derivative available".to_string()))
    }

    /// Delete an original, then best-effort delete its derivatives.
    pub async fn delete(&self, rel: &str) -> Result<(), AppError> {
        let key = normalize_key(rel).map_err(AppError::from)?;
        self.originals.delete(&key).await?;

        let removed = self.derivatives.delete_for(&key).await;
        tracing::info!(rel = %key, derivatives_removed = removed, "Asset deleted");
        Ok(())
    }

    /// Regenerate derivatives now and return what was written.
    pub async fn regenerate(&self, rel: &str) -> Result<DerivativeSet, AppError> {
        let key = normalize_key(rel).map_err(AppError::from)?;
        if !self.originals.exists(&key).await? {
            return Err(AppError::NotFound(format!("Not found: {}", key)));
        }

        run_generator(self.generator.clone(), key).await
    }

    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
