//! Video record repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use tubely_models::{Video, VideoId};
use uuid::Uuid;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

/// Top-level collection holding one document per video.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Fields written by `update`. Ownership and creation time never change.
const UPDATE_MASK: [&str; 5] = ["title", "description", "video_url", "thumbnail_url", "updated_at"];

/// Persistent store of video records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Load a record. `Ok(None)` when it does not exist.
    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<Video>>;

    /// Persist the mutable fields of an existing record.
    async fn update(&self, video: &Video) -> FirestoreResult<()>;

    /// Cheap reachability check for readiness probes.
    async fn check_connectivity(&self) -> FirestoreResult<()>;
}

/// Firestore-backed `VideoStore`.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<Video>> {
        let doc = self
            .client
            .get_document(VIDEOS_COLLECTION, &id.to_string())
            .await?;

        doc.map(|d| document_to_video(&d, id)).transpose()
    }

    async fn update(&self, video: &Video) -> FirestoreResult<()> {
        self.client
            .update_document(
                VIDEOS_COLLECTION,
                &video.id.to_string(),
                video_to_fields(video),
                &UPDATE_MASK,
            )
            .await?;
        info!(video_id = %video.id, "Updated video record");
        Ok(())
    }

    async fn check_connectivity(&self) -> FirestoreResult<()> {
        self.client.check_connectivity(VIDEOS_COLLECTION).await
    }
}

fn video_to_fields(video: &Video) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("title".to_string(), video.title.to_firestore_value());
    fields.insert("description".to_string(), video.description.to_firestore_value());
    fields.insert("video_url".to_string(), video.video_url.to_firestore_value());
    fields.insert("thumbnail_url".to_string(), video.thumbnail_url.to_firestore_value());
    fields.insert("updated_at".to_string(), video.updated_at.to_firestore_value());
    fields
}

fn document_to_video(doc: &Document, id: &VideoId) -> FirestoreResult<Video> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_response("Document has no fields"))?;

    let get_string = |key: &str| fields.get(key).and_then(String::from_firestore_value);
    let get_time = |key: &str| -> DateTime<Utc> {
        fields
            .get(key)
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now)
    };

    let user_id = get_string("user_id")
        .and_then(|s| Uuid::parse_str(&s).ok())
        .ok_or_else(|| {
            FirestoreError::invalid_response(format!("Video {} has no valid user_id", id))
        })?;

    Ok(Video {
        id: *id,
        created_at: get_time("created_at"),
        updated_at: get_time("updated_at"),
        thumbnail_url: get_string("thumbnail_url").filter(|s| !s.is_empty()),
        video_url: get_string("video_url").filter(|s| !s.is_empty()),
        title: get_string("title").unwrap_or_default(),
        description: get_string("description").unwrap_or_default(),
        user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(fields: serde_json::Value) -> Document {
        serde_json::from_value(serde_json::json!({ "fields": fields })).unwrap()
    }

    #[test]
    fn test_document_to_video() {
        let id = VideoId::new();
        let owner = Uuid::new_v4();
        let doc = document(serde_json::json!({
            "user_id": {"stringValue": owner.to_string()},
            "title": {"stringValue": "Boots"},
            "video_url": {"stringValue": "tubely,landscape/abc.mp4"},
            "thumbnail_url": {"nullValue": null},
            "created_at": {"timestampValue": "2024-05-01T12:00:00Z"}
        }));

        let video = document_to_video(&doc, &id).unwrap();
        assert_eq!(video.id, id);
        assert_eq!(video.user_id, owner);
        assert_eq!(video.title, "Boots");
        assert_eq!(video.description, "");
        assert_eq!(video.video_url.as_deref(), Some("tubely,landscape/abc.mp4"));
        assert!(video.thumbnail_url.is_none());
        assert_eq!(video.created_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_document_without_owner_is_invalid() {
        let doc = document(serde_json::json!({"title": {"stringValue": "orphan"}}));
        let err = document_to_video(&doc, &VideoId::new()).unwrap_err();
        assert!(matches!(err, FirestoreError::InvalidResponse(_)));
    }

    #[test]
    fn test_video_to_fields_matches_mask() {
        let video = Video::new(VideoId::new(), Uuid::new_v4(), "Boots");
        let fields = video_to_fields(&video);
        for key in UPDATE_MASK {
            assert!(fields.contains_key(key), "missing {key}");
        }
        assert_eq!(fields.len(), UPDATE_MASK.len());
        assert_eq!(fields["video_url"], Value::NullValue(()));
    }
}
