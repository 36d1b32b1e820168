//! API configuration.
//!
//! Built once at startup and passed into `AppState`; nothing reads the
//! environment after that.

use std::path::PathBuf;
use std::time::Duration;

use tubely_storage::PLAYBACK_URL_TTL;

use crate::error::{ApiError, ApiResult};

/// Hard cap on a video upload request body.
pub const MAX_VIDEO_UPLOAD_BYTES: usize = 1 << 30;
/// Hard cap on a thumbnail upload request body.
pub const MAX_THUMBNAIL_UPLOAD_BYTES: usize = 10 << 20;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: String,
    pub max_video_upload_bytes: usize,
    pub max_thumbnail_upload_bytes: usize,
    /// HS256 secret for access tokens
    pub jwt_secret: String,
    /// Where in-flight uploads are staged
    pub staging_dir: PathBuf,
    /// Lifetime of signed playback URLs
    pub playback_url_ttl: Duration,
    /// Wall-clock bound on each ffmpeg/ffprobe run. `None` means unbounded.
    pub media_tool_timeout_secs: Option<u64>,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8091,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            max_video_upload_bytes: MAX_VIDEO_UPLOAD_BYTES,
            max_thumbnail_upload_bytes: MAX_THUMBNAIL_UPLOAD_BYTES,
            jwt_secret: String::new(),
            staging_dir: std::env::temp_dir(),
            playback_url_ttl: PLAYBACK_URL_TTL,
            media_tool_timeout_secs: None,
            metrics_enabled: true,
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::internal("JWT_SECRET must be set"))?;

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: parsed("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            // Limits may be lowered but never raised past the hard caps.
            max_video_upload_bytes: parsed("MAX_VIDEO_UPLOAD_BYTES")
                .map(|n: usize| n.min(MAX_VIDEO_UPLOAD_BYTES))
                .unwrap_or(defaults.max_video_upload_bytes),
            max_thumbnail_upload_bytes: parsed("MAX_THUMBNAIL_UPLOAD_BYTES")
                .map(|n: usize| n.min(MAX_THUMBNAIL_UPLOAD_BYTES))
                .unwrap_or(defaults.max_thumbnail_upload_bytes),
            jwt_secret,
            staging_dir: std::env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            playback_url_ttl: parsed("PLAYBACK_URL_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.playback_url_ttl),
            media_tool_timeout_secs: parsed("MEDIA_TOOL_TIMEOUT_SECS").filter(|s| *s > 0),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        })
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
