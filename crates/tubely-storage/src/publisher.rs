//! The object publication seam used by the ingestion pipeline.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tubely_models::ObjectLocation;

use crate::error::StorageResult;

/// Durable object storage with time-limited signed retrieval.
#[async_trait]
pub trait ObjectPublisher: Send + Sync {
    /// Bucket new objects are published to.
    fn bucket(&self) -> &str;

    /// Upload the whole file at `path` to `location`. Either the object lands
    /// in full or an error is returned.
    async fn publish(
        &self,
        location: &ObjectLocation,
        content_type: &str,
        path: &Path,
    ) -> StorageResult<()>;

    /// Mint a GET URL for `location` valid for `ttl`.
    async fn signed_url(&self, location: &ObjectLocation, ttl: Duration) -> StorageResult<String>;

    /// Cheap reachability check for readiness probes.
    async fn check_connectivity(&self) -> StorageResult<()>;
}
