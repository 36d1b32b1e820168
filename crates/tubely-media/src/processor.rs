//! The media processing seam used by the ingestion pipeline.

use async_trait::async_trait;
use std::path::Path;
use tubely_models::Orientation;

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::probe_dimensions;
use crate::remux::remux_fast_start;
use crate::staging::RemuxedArtifact;

/// Out-of-process media operations.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Rewrite `source` for progressive playback. The artifact is removed when dropped.
    async fn remux_fast_start(&self, source: &Path) -> MediaResult<RemuxedArtifact>;

    /// Classify the first video stream of `path` by aspect ratio.
    async fn probe_orientation(&self, path: &Path) -> MediaResult<Orientation>;

    /// Whether the backing tools are usable.
    fn is_available(&self) -> bool {
        true
    }
}

/// `MediaProcessor` backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProcessor {
    runner: FfmpegRunner,
}

impl FfmpegProcessor {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn remux_fast_start(&self, source: &Path) -> MediaResult<RemuxedArtifact> {
        remux_fast_start(source, &self.runner).await
    }

    async fn probe_orientation(&self, path: &Path) -> MediaResult<Orientation> {
        probe_dimensions(path, &self.runner).await?.orientation()
    }

    fn is_available(&self) -> bool {
        check_ffmpeg().is_ok() && check_ffprobe().is_ok()
    }
}
