//! In-memory collaborators and request builders for router tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use tubely_api::auth::issue_token;
use tubely_api::{create_router, ApiConfig, AppState};
use tubely_firestore::{FirestoreError, FirestoreResult, VideoStore};
use tubely_media::{processing_path, MediaError, MediaProcessor, MediaResult, RemuxedArtifact};
use tubely_models::{ObjectLocation, Orientation, Video, VideoId};
use tubely_storage::{ObjectPublisher, StorageError, StorageResult};

pub const SECRET: &str = "router-test-secret";
pub const BUCKET: &str = "tubely-test";
pub const BOUNDARY: &str = "tubely-boundary-7MA4YWxkTrZu0gW";
pub const REMUX_MARKER: &[u8] = b"faststart:";

#[derive(Default)]
pub struct MemoryStore {
    pub videos: Mutex<HashMap<VideoId, Video>>,
    pub updates: Mutex<Vec<Video>>,
    pub fail_gets: bool,
    pub fail_updates: bool,
}

impl MemoryStore {
    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    pub fn stored(&self, id: &VideoId) -> Video {
        self.videos.lock().unwrap().get(id).cloned().unwrap()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<Video>> {
        if self.fail_gets {
            return Err(FirestoreError::ServerError(503, "unavailable".to_string()));
        }
        Ok(self.videos.lock().unwrap().get(id).cloned())
    }

    async fn update(&self, video: &Video) -> FirestoreResult<()> {
        if self.fail_updates {
            return Err(FirestoreError::ServerError(503, "unavailable".to_string()));
        }
        self.updates.lock().unwrap().push(video.clone());
        self.videos.lock().unwrap().insert(video.id, video.clone());
        Ok(())
    }

    async fn check_connectivity(&self) -> FirestoreResult<()> {
        Ok(())
    }
}

pub struct Published {
    pub location: ObjectLocation,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<Published>>,
    pub fail_publish: bool,
}

impl RecordingPublisher {
    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectPublisher for RecordingPublisher {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn publish(&self, location: &ObjectLocation, content_type: &str, path: &Path) -> StorageResult<()> {
        if self.fail_publish {
            return Err(StorageError::upload_failed("bucket unreachable"));
        }
        let bytes = tokio::fs::read(path).await?;
        self.published.lock().unwrap().push(Published {
            location: location.clone(),
            content_type: content_type.to_string(),
            bytes,
        });
        Ok(())
    }

    async fn signed_url(&self, location: &ObjectLocation, ttl: Duration) -> StorageResult<String> {
        Ok(format!(
            "https://signed.test/{}/{}?expires_in={}",
            location.bucket,
            location.key,
            ttl.as_secs()
        ))
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Stands in for ffmpeg. The "remux" copies the source behind a marker so
/// tests can tell which file was published.
pub struct FakeMedia {
    pub orientation: Orientation,
    pub fail_remux: bool,
    pub time_out_remux: bool,
    pub fail_probe: bool,
    pub probed: Mutex<Vec<PathBuf>>,
    pub artifacts: Mutex<Vec<PathBuf>>,
}

impl FakeMedia {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            fail_remux: false,
            time_out_remux: false,
            fail_probe: false,
            probed: Mutex::new(Vec::new()),
            artifacts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn remux_fast_start(&self, source: &Path) -> MediaResult<RemuxedArtifact> {
        let output = processing_path(source);
        let artifact = RemuxedArtifact::adopt(&output);
        self.artifacts.lock().unwrap().push(output.clone());

        let mut bytes = REMUX_MARKER.to_vec();
        bytes.extend(tokio::fs::read(source).await?);
        tokio::fs::write(&output, bytes).await?;

        if self.time_out_remux {
            return Err(MediaError::Timeout(1));
        }
        if self.fail_remux {
            return Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with an error",
                Some("moov atom not found".to_string()),
                Some(1),
            ));
        }
        Ok(artifact)
    }

    async fn probe_orientation(&self, path: &Path) -> MediaResult<Orientation> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        if self.fail_probe {
            return Err(MediaError::invalid_video("no video stream"));
        }
        Ok(self.orientation)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub media: Arc<FakeMedia>,
    pub staging: TempDir,
    pub owner: Uuid,
    pub video_id: VideoId,
}

pub struct TestAppBuilder {
    store: MemoryStore,
    publisher: RecordingPublisher,
    media: FakeMedia,
    max_video_upload_bytes: Option<usize>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::default(),
            publisher: RecordingPublisher::default(),
            media: FakeMedia::new(Orientation::Landscape),
            max_video_upload_bytes: None,
        }
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.media.orientation = orientation;
        self
    }

    pub fn fail_remux(mut self) -> Self {
        self.media.fail_remux = true;
        self
    }

    pub fn time_out_remux(mut self) -> Self {
        self.media.time_out_remux = true;
        self
    }

    pub fn fail_gets(mut self) -> Self {
        self.store.fail_gets = true;
        self
    }

    pub fn fail_probe(mut self) -> Self {
        self.media.fail_probe = true;
        self
    }

    pub fn fail_publish(mut self) -> Self {
        self.publisher.fail_publish = true;
        self
    }

    pub fn fail_updates(mut self) -> Self {
        self.store.fail_updates = true;
        self
    }

    pub fn max_video_upload_bytes(mut self, limit: usize) -> Self {
        self.max_video_upload_bytes = Some(limit);
        self
    }

    pub fn build(self) -> TestApp {
        let staging = TempDir::new().unwrap();
        let owner = Uuid::new_v4();
        let video = Video::new(VideoId::new(), owner, "Boots on the ground");
        let video_id = video.id;
        self.store.insert(video);

        let mut config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            staging_dir: staging.path().to_path_buf(),
            ..ApiConfig::default()
        };
        if let Some(limit) = self.max_video_upload_bytes {
            config.max_video_upload_bytes = limit;
        }

        let store = Arc::new(self.store);
        let publisher = Arc::new(self.publisher);
        let media = Arc::new(self.media);
        let state = AppState::from_parts(config, store.clone(), publisher.clone(), media.clone());

        TestApp {
            router: create_router(state, None),
            store,
            publisher,
            media,
            staging,
            owner,
            video_id,
        }
    }
}

impl TestApp {
    pub fn token(&self) -> String {
        token_for(self.owner)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Files left behind in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.staging.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

pub fn token_for(user_id: Uuid) -> String {
    issue_token(SECRET, user_id, Duration::from_secs(3600)).unwrap()
}

/// One file part of a multipart body.
pub struct Part<'a> {
    pub name: &'a str,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            content_type: Some(content_type),
            data,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\n",
                part.name
            )
            .as_bytes(),
        );
        if let Some(content_type) = part.content_type {
            body.extend(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend(b"\r\n");
        body.extend(part.data);
        body.extend(b"\r\n");
    }
    body.extend(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Build a multipart POST. `token` of `None` sends no credentials.
pub fn upload_request(uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
