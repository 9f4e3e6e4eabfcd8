//! API configuration.

use std::path::PathBuf;

use blaze_models::budget::{DEFAULT_HARD_CAP_KB, DEFAULT_TARGET_KB};
use blaze_models::SizeBudget;
use blaze_session::SessionConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Thumbnail size budget
    pub budget: SizeBudget,
    /// Pairing TTL
    pub session: SessionConfig,
    /// Parent directory for transcode scratch space, system temp dir if unset
    pub work_dir: Option<PathBuf>,
    /// FFmpeg executable
    pub ffmpeg_bin: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_body_size: 20 * 1024 * 1024, // 20MB
            environment: "development".to_string(),
            metrics_enabled: true,
            budget: SizeBudget::default(),
            session: SessionConfig::default(),
            work_dir: None,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let budget = SizeBudget::new(
            std::env::var("TARGET_THUMB_KB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TARGET_KB),
            std::env::var("UPLOAD_THUMB_CAP_KB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HARD_CAP_KB),
            std::env::var("AGGRESSIVE_COMPRESSION")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        );

        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            budget,
            session: SessionConfig::from_env(),
            work_dir: std::env::var("THUMB_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            ffmpeg_bin: std::env::var("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ffmpeg")),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
