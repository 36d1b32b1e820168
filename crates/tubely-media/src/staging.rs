//! Scoped on-disk holding area for in-flight uploads.
//!
//! Both the staged upload and the remux artifact delete their file when
//! dropped, so every exit path of a request leaves nothing behind.

use bytes::Buf;
use futures_util::{Stream, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::error::MediaResult;

const STAGING_PREFIX: &str = "tubely-upload";

/// Raw request bytes staged to a uniquely named temp file.
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    size: u64,
}

impl StagedUpload {
    /// Copy `stream` into a fresh temp file under `dir`.
    ///
    /// On any stream or write error the partially written file is removed
    /// before the error is returned. Stream errors are wrapped as
    /// `io::Error` with the original error as the inner source.
    pub async fn from_stream<S, B, E>(dir: &Path, suffix: &str, stream: S) -> MediaResult<Self>
    where
        S: Stream<Item = Result<B, E>>,
        B: Buf,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (file, path) = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(suffix)
            .tempfile_in(dir)?
            .into_parts();

        let body = stream.map_err(io::Error::other);
        let body_reader = StreamReader::new(body);
        futures_util::pin_mut!(body_reader);

        let mut writer = BufWriter::new(File::from_std(file));
        let size = tokio::io::copy(&mut body_reader, &mut writer).await?;
        writer.flush().await?;

        debug!(path = %path.display(), bytes = size, "Staged upload");
        Ok(Self { path, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to disk.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A file derived from a staged upload. Removed on drop.
#[derive(Debug)]
pub struct RemuxedArtifact {
    path: PathBuf,
}

impl RemuxedArtifact {
    /// Take ownership of an existing file at `path`.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RemuxedArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to remove remux artifact: {}", e),
        }
    }
}
