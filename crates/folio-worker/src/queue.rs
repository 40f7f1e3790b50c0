//! Derivative queue: bounded channel, semaphore-limited worker pool, submission.
//!
//! Shutdown: [`DerivativeQueue::shutdown`] stops the dispatcher from taking new jobs;
//! it does not wait for in-flight generation. Dropping every handle has the same effect.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use folio_core::WorkerSettings;

use crate::context::DerivativeJobContext;

/// Result of one generation job as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Number of derivative files written
    Generated(usize),
    Failed(String),
}

/// Optional sender notified with `(rel, outcome)` when a job finishes.
pub type JobFinishedSender = mpsc::Sender<(String, JobOutcome)>;

#[derive(Clone, Debug)]
pub struct DerivativeQueueConfig {
    pub max_workers: usize,
    pub capacity: usize,
}

impl Default for DerivativeQueueConfig {
    fn default() -> Self {
        Self::from(&WorkerSettings::default())
    }
}

impl From<&WorkerSettings> for DerivativeQueueConfig {
    fn from(settings: &WorkerSettings) -> Self {
        Self {
            max_workers: settings.max_workers.max(1),
            capacity: settings.queue_capacity.max(1),
        }
    }
}

#[derive(Clone)]
pub struct DerivativeQueue {
    job_tx: mpsc::Sender<String>,
    shutdown_tx: mpsc::Sender<()>,
}

impl DerivativeQueue {
    /// Create the queue and spawn its dispatcher on the current runtime.
    pub fn new(
        config: DerivativeQueueConfig,
        context: Arc<dyn DerivativeJobContext>,
        job_finished_tx: Option<JobFinishedSender>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_pool(config, context, job_rx, shutdown_rx, job_finished_tx).await;
        });

        Self {
            job_tx,
            shutdown_tx,
        }
    }

    /// Enqueue generation for an original without waiting for it to run.
    ///
    /// Fails when the queue is full or has shut down; the job is dropped in that case.
    pub fn submit(&self, rel: &str) -> Result<()> {
        self.job_tx.try_send(rel.to_string()).map_err(|e| {
            tracing::warn!(rel = %rel, error = %e, "Failed to enqueue derivative job");
            anyhow!("Failed to enqueue derivative job for {}: {}", rel, e)
        })?;

        tracing::debug!(rel = %rel, "Derivative job submitted");
        Ok(())
    }

    async fn worker_pool(
        config: DerivativeQueueConfig,
        context: Arc<dyn DerivativeJobContext>,
        mut job_rx: mpsc::Receiver<String>,
        mut shutdown_rx: mpsc::Receiver<()>,
        job_finished_tx: Option<JobFinishedSender>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            capacity = config.capacity,
            "Derivative worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Derivative worker pool shutting down");
                    break;
                }
                job = job_rx.recv() => {
                    let Some(rel) = job else { break };

                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };

                    let ctx = context.clone();
                    let finished_tx = job_finished_tx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::process_job(rel, ctx, finished_tx).await;
                    });
                }
            }
        }

        tracing::info!("Derivative worker pool stopped");
    }

    async fn process_job(
        rel: String,
        context: Arc<dyn DerivativeJobContext>,
        job_finished_tx: Option<JobFinishedSender>,
    ) {
        let start = std::time::Instant::now();

        let outcome = match context.run_derivative_job(&rel).await {
            Ok(set) => {
                tracing::info!(
                    rel = %rel,
                    derivatives = set.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Derivative job completed"
                );
                JobOutcome::Generated(set.len())
            }
            Err(e) => {
                tracing::error!(rel = %rel, error = %e, "Derivative generation failed");
                JobOutcome::Failed(e.to_string())
            }
        };

        if let Some(tx) = job_finished_tx {
            let _ = tx.send((rel, outcome)).await;
        }
    }

    /// Signals the dispatcher to stop taking jobs. Returns without waiting for in-flight work.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating derivative queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::{DerivativeSet, Encoding};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingContext {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DerivativeJobContext for CountingContext {
        async fn run_derivative_job(self: Arc<Self>, rel: &str) -> Result<DerivativeSet> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if rel.ends_with(".txt") {
                return Err(anyhow!("unsupported"));
            }
            let mut set = DerivativeSet::empty();
            set.push(Encoding::WebP, format!("{}_w480.webp", rel));
            Ok(set)
        }
    }

    async fn collect(rx: &mut mpsc::Receiver<(String, JobOutcome)>, n: usize) -> Vec<(String, JobOutcome)> {
        let mut out = Vec::new();
        for _ in 0..n {
            let item = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("job did not finish in time")
                .expect("channel closed");
            out.push(item);
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    #[tokio::test]
    async fn test_jobs_report_outcomes() {
        let (tx, mut rx) = mpsc::channel(8);
        let queue = DerivativeQueue::new(
            DerivativeQueueConfig::default(),
            Arc::new(CountingContext::default()),
            Some(tx),
        );

        queue.submit("a").unwrap();
        queue.submit("notes.txt").unwrap();

        let results = collect(&mut rx, 2).await;
        assert_eq!(results[0], ("a".to_string(), JobOutcome::Generated(1)));
        assert_eq!(results[1].0, "notes.txt");
        assert!(matches!(results[1].1, JobOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_worker_limit_is_respected() {
        let (tx, mut rx) = mpsc::channel(16);
        let context = Arc::new(CountingContext::default());
        let queue = DerivativeQueue::new(
            DerivativeQueueConfig {
                max_workers: 1,
                capacity: 16,
            },
            context.clone(),
            Some(tx),
        );

        for i in 0..4 {
            queue.submit(&format!("img{}", i)).unwrap();
        }
        collect(&mut rx, 4).await;

        assert_eq!(context.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_from_settings_is_never_zero() {
        let config = DerivativeQueueConfig::from(&WorkerSettings {
            max_workers: 0,
            queue_capacity: 0,
        });
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.capacity, 1);
    }
}
