//! Test helpers: build the router over temporary media roots.
//!
//! Run from workspace root: `cargo test -p folio-api`.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use folio_api::setup::{build_state, routes};
use folio_api::JobOutcome;
use folio_core::{AuthConfig, Config, MediaSettings};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// API path prefix for tests.
pub fn api_path(path: &str) -> String {
    format!("/api{}", path)
}

/// Test application: server, temp roots, and the background job observer.
pub struct TestApp {
    pub server: TestServer,
    pub settings: MediaSettings,
    pub jobs: mpsc::Receiver<(String, JobOutcome)>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn media_root(&self) -> &PathBuf {
        &self.settings.media_root
    }

    pub fn deriv_root(&self) -> &PathBuf {
        &self.settings.deriv_root
    }

    /// Wait for the next background derivative job to finish.
    pub async fn next_job(&mut self) -> (String, JobOutcome) {
        tokio::time::timeout(Duration::from_secs(30), self.jobs.recv())
            .await
            .expect("Derivative job did not finish in time")
            .expect("Job channel closed")
    }
}

pub struct TestAppBuilder {
    widths: Vec<u32>,
    max_upload_bytes: Option<u64>,
    auth: AuthConfig,
    environment: Option<String>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            widths: vec![64, 32],
            max_upload_bytes: None,
            auth: auth::test_auth_config(),
            environment: None,
        }
    }
}

impl TestAppBuilder {
    pub fn widths(mut self, widths: Vec<u32>) -> Self {
        self.widths = widths;
        self
    }

    pub fn max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = Some(max);
        self
    }

    pub fn without_auth(mut self) -> Self {
        self.auth = AuthConfig::default();
        self
    }

    pub fn environment(mut self, environment: &str) -> Self {
        self.environment = Some(environment.to_string());
        self
    }

    pub async fn build(self) -> TestApp {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut settings = MediaSettings::new(
            temp_dir.path().join("media"),
            temp_dir.path().join("media_deriv"),
        )
        .with_widths(self.widths)
        .with_avif(false);
        if let Some(max) = self.max_upload_bytes {
            settings = settings.with_max_upload_bytes(max);
        }

        let mut config = Config::for_media(settings.clone()).with_auth(self.auth);
        if let Some(environment) = self.environment {
            config = config.with_environment(environment);
        }
        config.validate().expect("Invalid test config");

        let (jobs_tx, jobs) = mpsc::channel(32);
        let state = build_state(config.clone(), Some(jobs_tx))
            .await
            .expect("Failed to build state");
        let router = routes::setup_routes(&config, state).expect("Failed to build routes");

        TestApp {
            server: TestServer::new(router.into_make_service()).expect("Failed to start test server"),
            settings,
            jobs,
            _temp_dir: temp_dir,
        }
    }
}

/// Setup test app with default widths (64, 32), WebP only, and a configured JWT secret.
pub async fn setup_test_app() -> TestApp {
    TestAppBuilder::default().build().await
}
