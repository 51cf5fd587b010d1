//! Local file track opener.

use crate::{OpenError, Result, TrackSource, TrackStream};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

const READ_CHUNK_BYTES: usize = 16 * 1024;

/// Opens tracks stored on the local filesystem.
///
/// Accepts `file://` URIs and bare paths; bare relative paths resolve
/// against the configured root directory when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileTrackSource {
    root: Option<PathBuf>,
}

impl FileTrackSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, uri: &str) -> Result<PathBuf> {
        let path = match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| OpenError::InvalidFileUri(uri.to_string()))?,
            _ => PathBuf::from(uri),
        };

        if path.is_relative() {
            if let Some(root) = &self.root {
                return Ok(root.join(path));
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl TrackSource for FileTrackSource {
    async fn open(&self, uri: &str) -> Result<TrackStream> {
        let path = self.resolve(uri)?;
        debug!("Opening local track: {}", path.display());

        let file = File::open(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => OpenError::NotFound(display_path(&path)),
            _ => OpenError::Io(e),
        })?;

        Ok(TrackStream::new(ReaderStream::with_capacity(
            file,
            READ_CHUNK_BYTES,
        )))
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
