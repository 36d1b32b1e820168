//! Signed playback URLs for stored references.

use std::time::Duration;
use tracing::debug;
use tubely_models::ObjectLocation;

use crate::error::StorageResult;
use crate::publisher::ObjectPublisher;

/// Lifetime of playback and thumbnail URLs handed to clients.
pub const PLAYBACK_URL_TTL: Duration = Duration::from_secs(10 * 60);

/// Resolve a persisted `"bucket,key"` reference to a signed GET URL.
pub async fn sign_reference(
    publisher: &dyn ObjectPublisher,
    reference: &str,
    ttl: Duration,
) -> StorageResult<String> {
    let location = ObjectLocation::parse(reference)?;
    debug!(bucket = %location.bucket, key = %location.key, ttl_secs = ttl.as_secs(), "Signing object URL");
    publisher.signed_url(&location, ttl).await
}
