//! Fast-start remux: rewrite the container so the index precedes media data.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::staging::RemuxedArtifact;

/// Suffix appended to the source path to name the remux output.
pub const PROCESSING_SUFFIX: &str = ".processing";

/// `{source}.processing`
pub fn processing_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(PROCESSING_SUFFIX);
    PathBuf::from(name)
}

/// Stream-copy `source` into an MP4 with `faststart` set.
///
/// The returned artifact owns the output file. If FFmpeg fails, any partial
/// output is removed before the error is returned.
pub async fn remux_fast_start(source: &Path, runner: &FfmpegRunner) -> MediaResult<RemuxedArtifact> {
    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }

    let output = processing_path(source);
    let artifact = RemuxedArtifact::adopt(&output);

    let cmd = FfmpegCommand::new(source, &output)
        .stream_copy()
        .movflags("faststart")
        .format("mp4");
    runner.run(&cmd).await?;

    if !artifact.path().exists() {
        return Err(MediaError::ffmpeg_failed(
            "FFmpeg exited successfully but produced no output",
            None,
            Some(0),
        ));
    }

    info!(output = %output.display(), "Remuxed upload for fast start");
    Ok(artifact)
}
