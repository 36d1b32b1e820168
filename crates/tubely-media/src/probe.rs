//! FFprobe stream geometry.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;
use tubely_models::Orientation;

use crate::command::{check_ffprobe, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Pixel geometry of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    /// Orientation label, or `InvalidVideo` for zero-sized geometry.
    pub fn orientation(&self) -> MediaResult<Orientation> {
        Orientation::classify(self.width, self.height).ok_or_else(|| {
            MediaError::invalid_video(format!(
                "Degenerate video geometry {}x{}",
                self.width, self.height
            ))
        })
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a file for the geometry of its first video stream.
pub async fn probe_dimensions(
    path: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<VideoDimensions> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;
    debug!(path = %path.display(), "Running FFprobe");

    let mut command = Command::new("ffprobe");
    command
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path);
    let output = runner.output("ffprobe", &mut command).await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        ));
    }

    parse_dimensions(&output.stdout)
}

/// Extract the first video stream's width and height from FFprobe JSON.
pub(crate) fn parse_dimensions(stdout: &[u8]) -> MediaResult<VideoDimensions> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    if probe.streams.is_empty() {
        return Err(MediaError::invalid_video("FFprobe reported no streams"));
    }

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    match (video_stream.width, video_stream.height) {
        (Some(width), Some(height)) => Ok(VideoDimensions { width, height }),
        _ => Err(MediaError::invalid_video("Video stream has no dimensions")),
    }
}
