//! Application state.

use std::sync::Arc;

use tubely_firestore::{FirestoreClient, VideoRepository, VideoStore};
use tubely_media::{FfmpegProcessor, FfmpegRunner, MediaProcessor};
use tubely_storage::{ObjectPublisher, S3Client};

use crate::auth::JwtVerifier;
use crate::config::ApiConfig;
use crate::services::IngestService;

/// Shared application state. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub auth: Arc<JwtVerifier>,
    pub store: Arc<dyn VideoStore>,
    pub publisher: Arc<dyn ObjectPublisher>,
    pub media: Arc<dyn MediaProcessor>,
    pub ingest: Arc<IngestService>,
}

impl AppState {
    /// Connect to S3 and Firestore and locate the media tools.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let publisher = S3Client::from_env().await?;
        let firestore = FirestoreClient::from_env().await?;

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = config.media_tool_timeout_secs {
            runner = runner.with_timeout(secs);
        }

        Ok(Self::from_parts(
            config,
            Arc::new(VideoRepository::new(firestore)),
            Arc::new(publisher),
            Arc::new(FfmpegProcessor::new(runner)),
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        store: Arc<dyn VideoStore>,
        publisher: Arc<dyn ObjectPublisher>,
        media: Arc<dyn MediaProcessor>,
    ) -> Self {
        let ingest = IngestService::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
            Arc::clone(&media),
            config.staging_dir.clone(),
            config.playback_url_ttl,
        );

        Self {
            auth: Arc::new(JwtVerifier::new(&config.jwt_secret)),
            config: Arc::new(config),
            store,
            publisher,
            media,
            ingest: Arc::new(ingest),
        }
    }
}
