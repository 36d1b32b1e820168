//! Video ingestion and publication.
//!
//! The pipeline is strictly sequential: authorize, stage, remux, classify,
//! derive key, publish, persist, sign. Nothing is retried. The staged upload
//! and the remux artifact are removed on every exit path because both are
//! dropped before the handler returns.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::Buf;
use futures_util::Stream;
use tracing::{error, info, warn};

use tubely_firestore::VideoStore;
use tubely_media::{MediaError, MediaProcessor, StagedUpload};
use tubely_models::{MediaType, ObjectLocation, Video, VideoId};
use tubely_storage::{sign_reference, thumbnail_key, video_key, ObjectPublisher, StorageError};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

/// Orchestrates ingestion against the store, publisher, and media seams.
pub struct IngestService {
    store: Arc<dyn VideoStore>,
    publisher: Arc<dyn ObjectPublisher>,
    media: Arc<dyn MediaProcessor>,
    staging_dir: PathBuf,
    playback_url_ttl: Duration,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn VideoStore>,
        publisher: Arc<dyn ObjectPublisher>,
        media: Arc<dyn MediaProcessor>,
        staging_dir: PathBuf,
        playback_url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            media,
            staging_dir,
            playback_url_ttl,
        }
    }

    /// Load a record and check that `user` owns it.
    pub async fn load_owned(&self, video_id: &VideoId, user: &AuthUser) -> ApiResult<Video> {
        let video = self
            .store
            .get(video_id)
            .await
            .map_err(|e| {
                error!(video_id = %video_id, "Failed to load video record: {}", e);
                ApiError::internal("Couldn't load video")
            })?
            .ok_or_else(|| ApiError::not_found("Couldn't find video"))?;

        if !video.is_owned_by(&user.user_id) {
            warn!(
                video_id = %video_id,
                user_id = %user.user_id,
                "Rejected access to a video owned by another user"
            );
            return Err(ApiError::forbidden("Not authorized to access this video"));
        }

        Ok(video)
    }

    /// Stream a multipart field to a fresh staging file named for its type.
    pub async fn stage<S, B, E>(&self, media_type: &MediaType, stream: S) -> ApiResult<StagedUpload>
    where
        S: Stream<Item = Result<B, E>>,
        B: Buf,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let suffix = format!(".{}", media_type.extension());
        StagedUpload::from_stream(&self.staging_dir, &suffix, stream)
            .await
            .map_err(staging_error)
    }

    /// Remux, classify, publish, and persist a staged video. Returns the
    /// updated record with a signed playback URL.
    pub async fn publish_video(
        &self,
        mut video: Video,
        staged: &StagedUpload,
        media_type: &MediaType,
    ) -> ApiResult<Video> {
        let artifact = self
            .media
            .remux_fast_start(staged.path())
            .await
            .map_err(|e| media_error(&video.id, "remux", e))?;

        // Geometry comes from the original upload. A stream copy leaves it unchanged.
        let orientation = self
            .media
            .probe_orientation(staged.path())
            .await
            .map_err(|e| media_error(&video.id, "probe", e))?;

        let location = ObjectLocation::new(
            self.publisher.bucket(),
            video_key(orientation, media_type.extension()),
        );

        self.publisher
            .publish(&location, media_type.as_str(), artifact.path())
            .await
            .map_err(|e| {
                error!(video_id = %video.id, key = %location.key, "Failed to upload video: {}", e);
                ApiError::storage_unavailable("Couldn't upload video")
            })?;
        drop(artifact);

        video.video_url = Some(location.to_reference());
        video.touch();
        self.persist(&video, &location).await?;

        info!(
            video_id = %video.id,
            orientation = %orientation,
            key = %location.key,
            bytes = staged.size(),
            "Published video"
        );

        self.sign_video(video).await
    }

    /// Publish a staged thumbnail and persist its location.
    pub async fn publish_thumbnail(
        &self,
        mut video: Video,
        staged: &StagedUpload,
        media_type: &MediaType,
    ) -> ApiResult<Video> {
        let location = ObjectLocation::new(
            self.publisher.bucket(),
            thumbnail_key(media_type.extension()),
        );

        self.publisher
            .publish(&location, media_type.as_str(), staged.path())
            .await
            .map_err(|e| {
                error!(video_id = %video.id, key = %location.key, "Failed to upload thumbnail: {}", e);
                ApiError::storage_unavailable("Couldn't upload thumbnail")
            })?;

        video.thumbnail_url = Some(location.to_reference());
        video.touch();
        self.persist(&video, &location).await?;

        info!(video_id = %video.id, key = %location.key, "Published thumbnail");
        self.sign_video(video).await
    }

    /// Replace stored references with signed URLs for display.
    pub async fn sign_video(&self, mut video: Video) -> ApiResult<Video> {
        if let Some(reference) = video.video_url.take() {
            video.video_url = Some(self.sign(&video.id, &reference).await?);
        }
        if let Some(reference) = video.thumbnail_url.take() {
            video.thumbnail_url = Some(self.sign(&video.id, &reference).await?);
        }
        Ok(video)
    }

    async fn sign(&self, video_id: &VideoId, reference: &str) -> ApiResult<String> {
        sign_reference(self.publisher.as_ref(), reference, self.playback_url_ttl)
            .await
            .map_err(|e| match e {
                StorageError::InvalidLocation(_) => {
                    error!(video_id = %video_id, "Stored location is malformed: {}", e);
                    ApiError::internal("Couldn't generate presigned URL")
                }
                _ => {
                    error!(video_id = %video_id, "Failed to sign URL: {}", e);
                    ApiError::storage_unavailable("Couldn't generate presigned URL")
                }
            })
    }

    async fn persist(&self, video: &Video, location: &ObjectLocation) -> ApiResult<()> {
        self.store.update(video).await.map_err(|e| {
            // The object is stored but unreferenced from here on.
            error!(
                video_id = %video.id,
                bucket = %location.bucket,
                key = %location.key,
                "Failed to update video record after upload: {}",
                e
            );
            ApiError::persistence_failed("Couldn't update video")
        })
    }
}

fn media_error(video_id: &VideoId, step: &str, e: MediaError) -> ApiError {
    error!(
        video_id = %video_id,
        step,
        stderr = e.stderr().unwrap_or_default(),
        "Media processing failed: {}",
        e
    );
    ApiError::processing_failed("Could not process video")
}

/// Map a staging failure. Body errors carry the multipart error inside the
/// `io::Error`; an exceeded body limit surfaces there as a 413.
pub(crate) fn staging_error(e: MediaError) -> ApiError {
    match e {
        MediaError::Io(io_err) => match multipart_source(&io_err) {
            Some(me) => multipart_error(me),
            None => {
                error!("Failed to stage upload: {}", io_err);
                ApiError::internal("Couldn't write file to disk")
            }
        },
        other => {
            error!("Failed to stage upload: {}", other);
            ApiError::internal("Couldn't write file to disk")
        }
    }
}

fn multipart_source(e: &io::Error) -> Option<&MultipartError> {
    e.get_ref()?.downcast_ref::<MultipartError>()
}

/// Map a multipart parsing or body read failure.
pub(crate) fn multipart_error(e: &MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload exceeded body limit: {}", e.body_text());
        ApiError::PayloadTooLarge("Upload exceeds the maximum allowed size".to_string())
    } else {
        warn!("Malformed or interrupted multipart body: {}", e.body_text());
        ApiError::invalid_input("Couldn't read multipart body")
    }
}
