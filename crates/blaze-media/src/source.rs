//! Source image inspection.

use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// A cover image as received from the caller.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: PathBuf,
    bytes: Vec<u8>,
    format: Option<ImageFormat>,
}

impl SourceImage {
    /// Read and sniff an image on disk.
    ///
    /// Fails with [`MediaError::SourceUnreadable`] when the file cannot be read
    /// or is empty. Unknown formats are not an error here: FFmpeg may still
    /// decode them.
    pub async fn read(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::source_unreadable(path, e.to_string()))?;
        Self::from_bytes(path, bytes)
    }

    /// Wrap bytes already stored at `path`.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> MediaResult<Self> {
        let path = path.into();
        if bytes.is_empty() {
            return Err(MediaError::source_unreadable(path, "empty file"));
        }
        let format = image::guess_format(&bytes).ok();
        Ok(Self {
            path,
            bytes,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Whether the content is already JPEG-encoded, judged by magic bytes.
    pub fn is_jpeg(&self) -> bool {
        self.format == Some(ImageFormat::Jpeg)
    }

    /// Pixel dimensions from the image header, when the format is known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let format = self.format?;
        image::io::Reader::with_format(Cursor::new(&self.bytes), format)
            .into_dimensions()
            .ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The same content, now stored at `path`.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..self
        }
    }
}
