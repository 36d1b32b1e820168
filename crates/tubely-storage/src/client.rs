//! S3 client implementation.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};
use tubely_models::ObjectLocation;

use crate::error::{StorageError, StorageResult};
use crate::publisher::ObjectPublisher;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket new objects are written to
    pub bucket_name: String,
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, R2, LocalStack)
    pub endpoint_url: Option<String>,
    /// Static credentials. When unset the default AWS provider chain is used.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let optional = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let config = Self {
            bucket_name: std::env::var("S3_BUCKET")
                .map_err(|_| StorageError::config_error("S3_BUCKET not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: optional("S3_ENDPOINT_URL"),
            access_key_id: optional("S3_ACCESS_KEY_ID"),
            secret_access_key: optional("S3_SECRET_ACCESS_KEY"),
        };

        if config.access_key_id.is_some() != config.secret_access_key.is_some() {
            return Err(StorageError::config_error(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together",
            ));
        }

        Ok(config)
    }
}

/// S3 storage client. Cheap to clone and safe to share across requests.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let mut builder = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .credentials_provider(Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "tubely-static",
                )),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };

        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        Ok(Self {
            client,
            bucket: config.bucket_name,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Upload a file, streaming it from disk.
    pub async fn upload_file(
        &self,
        location: &ObjectLocation,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), location);

        let started = Instant::now();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        metrics::histogram!("tubely_storage_upload_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!("Uploaded {} to {}", path.display(), location);
        Ok(())
    }

    /// Generate a presigned URL for downloading.
    pub async fn presign_get(
        &self,
        location: &ObjectLocation,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ObjectPublisher for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn publish(
        &self,
        location: &ObjectLocation,
        content_type: &str,
        path: &Path,
    ) -> StorageResult<()> {
        self.upload_file(location, path, content_type).await
    }

    async fn signed_url(&self, location: &ObjectLocation, ttl: Duration) -> StorageResult<String> {
        self.presign_get(location, ttl).await
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("S3 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn static_config() -> S3Config {
        S3Config {
            bucket_name: "tubely-media".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: Some("http://localhost:9000".to_string()),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        }
    }

    #[tokio::test]
    async fn test_presign_get_is_bound_to_location_and_ttl() {
        let client = S3Client::new(static_config()).await.unwrap();
        let location = ObjectLocation::new("tubely-media", "landscape/abc.mp4");

        let url = client
            .signed_url(&location, Duration::from_secs(600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/tubely-media/landscape/abc.mp4?"));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Credential=AKIDEXAMPLE"));
    }

    #[tokio::test]
    async fn test_presign_rejects_excessive_ttl() {
        let client = S3Client::new(static_config()).await.unwrap();
        let location = ObjectLocation::new("tubely-media", "portrait/abc.mp4");

        // SigV4 presigned URLs are capped at one week.
        let err = client
            .presign_get(&location, Duration::from_secs(8 * 24 * 3600))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PresignFailed(_)));
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails_before_request() {
        let client = S3Client::new(static_config()).await.unwrap();
        let location = ObjectLocation::new("tubely-media", "other/abc.mp4");

        let err = client
            .publish(&location, "video/mp4", Path::new("/nonexistent/upload.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("S3_BUCKET", "tubely-test");
        std::env::remove_var("S3_REGION");
        std::env::remove_var("S3_ENDPOINT_URL");
        std::env::remove_var("S3_ACCESS_KEY_ID");
        std::env::remove_var("S3_SECRET_ACCESS_KEY");

        let config = S3Config::from_env().unwrap();
        assert_eq!(config.bucket_name, "tubely-test");
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint_url.is_none());

        std::env::set_var("S3_ACCESS_KEY_ID", "only-half");
        assert!(matches!(
            S3Config::from_env(),
            Err(StorageError::ConfigError(_))
        ));

        std::env::remove_var("S3_ACCESS_KEY_ID");
        std::env::remove_var("S3_BUCKET");
        assert!(S3Config::from_env().is_err());
    }

    /// Round trip against a real bucket: publish, sign, fetch anonymously.
    #[tokio::test]
    #[ignore = "requires S3 credentials and S3_BUCKET"]
    async fn test_publish_then_signed_fetch_round_trip() {
        let client = S3Client::from_env().await.unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"tubely round trip").unwrap();

        let location = ObjectLocation::new(
            client.bucket(),
            crate::keys::derive_object_key("other", &crate::keys::random_object_id(), "bin"),
        );
        client
            .publish(&location, "application/octet-stream", &path)
            .await
            .unwrap();

        let url = client
            .signed_url(&location, Duration::from_secs(60))
            .await
            .unwrap();
        let body = reqwest::get(&url).await.unwrap().bytes().await.unwrap();
        assert_eq!(&body[..], b"tubely round trip");

        let expired = client
            .signed_url(&location, Duration::from_secs(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        let status = reqwest::get(&expired).await.unwrap().status();
        assert_eq!(status.as_u16(), 403);
    }
}
