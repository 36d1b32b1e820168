//! FFmpeg CLI wrapper and upload staging for Tubely.
//!
//! This crate provides:
//! - Scoped on-disk staging of uploaded bytes with guaranteed cleanup
//! - Fast-start remuxing (stream copy, no re-encode)
//! - FFprobe stream geometry and orientation classification
//! - The `MediaProcessor` seam the ingestion pipeline is written against

pub mod command;
pub mod error;
pub mod probe;
pub mod processor;
pub mod remux;
pub mod staging;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_dimensions, VideoDimensions};
pub use processor::{FfmpegProcessor, MediaProcessor};
pub use remux::{processing_path, remux_fast_start, PROCESSING_SUFFIX};
pub use staging::{RemuxedArtifact, StagedUpload};
