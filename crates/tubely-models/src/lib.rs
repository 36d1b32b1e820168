//! Shared data models for the Tubely backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video asset records and their identifiers
//! - Stored object locations (`"bucket,key"` references)
//! - Orientation labels derived from stream geometry
//! - Declared media types and their file extensions

pub mod location;
pub mod media_type;
pub mod orientation;
pub mod video;

// Re-export common types
pub use location::{LocationParseError, ObjectLocation};
pub use media_type::{extension_for, MediaType, MediaTypeError, IMAGE_JPEG, IMAGE_PNG, VIDEO_MP4};
pub use orientation::Orientation;
pub use video::{Video, VideoId, VideoIdError};
