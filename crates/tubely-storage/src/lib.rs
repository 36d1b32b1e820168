//! S3 object storage for Tubely.
//!
//! Objects are private. Clients only ever receive time-limited presigned
//! GET URLs minted from a stored `"bucket,key"` reference.

pub mod client;
pub mod delivery;
pub mod error;
pub mod keys;
pub mod publisher;

pub use client::{S3Client, S3Config};
pub use delivery::{sign_reference, PLAYBACK_URL_TTL};
pub use error::{StorageError, StorageResult};
pub use keys::{derive_object_key, random_object_id, thumbnail_key, video_key};
pub use publisher::ObjectPublisher;
