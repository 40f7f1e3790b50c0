//! Configuration module
//!
//! Process-wide settings are read once at startup (environment plus an optional
//! `.env` file) into an explicit [`Config`] that is threaded into each component.

use std::env;
use std::path::PathBuf;

const DEFAULT_MEDIA_ROOT: &str = "./media";
const DEFAULT_DERIV_ROOT: &str = "./media_deriv";
const DEFAULT_MEDIA_BASE_URL: &str = "/media";
const DEFAULT_DERIV_BASE_URL: &str = "/media-deriv";
const DEFAULT_MAX_UPLOAD_MB: u64 = 200;
const DEFAULT_DERIV_WIDTHS: &str = "2048,1280,800,480";
const DEFAULT_DERIV_QUALITY: u8 = 82;
const DEFAULT_MAX_WORKERS: usize = 2;
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_API_PREFIX: &str = "/api";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Media roots, URL prefixes and derivative parameters
#[derive(Clone, Debug)]
pub struct MediaSettings {
    pub media_root: PathBuf,
    pub deriv_root: PathBuf,
    pub media_base_url: String,
    pub deriv_base_url: String,
    pub max_upload_bytes: u64,
    /// Target derivative widths in configured order
    pub deriv_widths: Vec<u32>,
    /// Encoder quality, 0-100
    pub deriv_quality: u8,
    pub avif_enabled: bool,
}

impl MediaSettings {
    /// Settings rooted at the given directories with every other value defaulted.
    pub fn new(media_root: impl Into<PathBuf>, deriv_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            deriv_root: deriv_root.into(),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            deriv_base_url: DEFAULT_DERIV_BASE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            deriv_widths: parse_widths(DEFAULT_DERIV_WIDTHS),
            deriv_quality: DEFAULT_DERIV_QUALITY,
            avif_enabled: true,
        }
    }

    pub fn with_widths(mut self, widths: Vec<u32>) -> Self {
        self.deriv_widths = widths;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_avif(mut self, enabled: bool) -> Self {
        self.avif_enabled = enabled;
        self
    }

    /// Comma-joined widths, as echoed back to uploaders
    pub fn widths_csv(&self) -> String {
        self.deriv_widths
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Background derivative worker settings
#[derive(Clone, Debug)]
pub struct WorkerSettings {
    pub max_workers: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Bearer-token verification for administrative endpoints
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub audience: Option<String>,
    pub issuer: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base: BaseConfig,
    pub media: MediaSettings,
    pub worker: WorkerSettings,
    pub auth: AuthConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

impl Config {
    pub fn new(
        base: BaseConfig,
        media: MediaSettings,
        worker: WorkerSettings,
        auth: AuthConfig,
    ) -> Self {
        Config(Box::new(AppConfig {
            base,
            media,
            worker,
            auth,
        }))
    }

    /// Development defaults around the given media settings. Used by tests and tools.
    pub fn for_media(media: MediaSettings) -> Self {
        Self::new(
            BaseConfig {
                server_port: DEFAULT_PORT,
                api_prefix: DEFAULT_API_PREFIX.to_string(),
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
            },
            media,
            WorkerSettings::default(),
            AuthConfig::default(),
        )
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AppConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.0.validate()
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.0.auth = auth;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.0.base.environment = environment.into();
        self
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.0.base.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.0.base.server_port
    }

    pub fn api_prefix(&self) -> &str {
        &self.0.base.api_prefix
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.0.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.0.base.environment
    }

    pub fn media(&self) -> &MediaSettings {
        &self.0.media
    }

    pub fn worker(&self) -> &WorkerSettings {
        &self.0.worker
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.0.auth
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Parse a comma-separated width list. Entries that are not positive integers are skipped.
pub fn parse_widths(raw: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|s| s.parse::<u32>().ok())
        .filter(|w| *w > 0)
        .collect()
}

/// `MAX_UPLOAD_MB` in bytes; values that overflow `u64` are rejected.
fn upload_limit_bytes(mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_MB is too large: {}", mb))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str =
            env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string()),
            cors_origins,
            environment,
        };

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_MB.to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_MB must be a valid number"))?;

        let deriv_quality = env::var("DERIV_QUALITY")
            .unwrap_or_else(|_| DEFAULT_DERIV_QUALITY.to_string())
            .parse::<u8>()
            .map_err(|_| anyhow::anyhow!("DERIV_QUALITY must be a number between 0 and 100"))?;

        let media = MediaSettings {
            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| DEFAULT_MEDIA_ROOT.to_string())
                .into(),
            deriv_root: env::var("MEDIA_DERIV_ROOT")
                .unwrap_or_else(|_| DEFAULT_DERIV_ROOT.to_string())
                .into(),
            media_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MEDIA_BASE_URL.to_string()),
            deriv_base_url: env::var("MEDIA_DERIV_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_DERIV_BASE_URL.to_string()),
            max_upload_bytes: upload_limit_bytes(max_upload_mb)?,
            deriv_widths: parse_widths(
                &env::var("DERIV_WIDTHS").unwrap_or_else(|_| DEFAULT_DERIV_WIDTHS.to_string()),
            ),
            deriv_quality,
            avif_enabled: env::var("DERIV_AVIF_ENABLED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
        };

        let worker = WorkerSettings {
            max_workers: env::var("DERIV_MAX_WORKERS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_MAX_WORKERS)
                .max(1),
            queue_capacity: env::var("DERIV_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_QUEUE_CAPACITY)
                .max(1),
        };

        let auth = AuthConfig {
            jwt_secret: optional_var("AUTH_JWT_SECRET"),
            audience: optional_var("AUTH_AUDIENCE"),
            issuer: optional_var("AUTH_ISSUER"),
        };

        Ok(Self {
            base,
            media,
            worker,
            auth,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.media.deriv_quality > 100 {
            return Err(anyhow::anyhow!(
                "DERIV_QUALITY must be between 0 and 100, got {}",
                self.media.deriv_quality
            ));
        }

        if self.media.deriv_widths.is_empty() {
            return Err(anyhow::anyhow!(
                "DERIV_WIDTHS must contain at least one positive integer"
            ));
        }

        if self.media.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_MB must be greater than 0"));
        }

        if self.media.media_root == self.media.deriv_root {
            return Err(anyhow::anyhow!(
                "MEDIA_ROOT and MEDIA_DERIV_ROOT must be different directories"
            ));
        }

        if !self.base.api_prefix.starts_with('/') {
            return Err(anyhow::anyhow!("API_PREFIX must start with '/'"));
        }

        Ok(())
    }
}
