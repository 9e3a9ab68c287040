use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tracing::debug;

/// A file picked by the user, held in memory for submission and preview.
///
/// A file loaded with [`from_path_within`](Self::from_path_within) that is
/// over the ceiling keeps only its size; validation refuses it before any
/// request is built.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub source_path: Option<PathBuf>,
    size: u64,
    bytes: Arc<[u8]>,
}

impl UploadFile {
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = Arc::from(bytes.into());
        Self {
            filename: filename.into(),
            source_path: None,
            size: bytes.len() as u64,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_within(path, u64::MAX).await
    }

    /// Like [`from_path`](Self::from_path), but a file larger than
    /// `max_bytes` is only stat'ed, never read.
    pub async fn from_path_within(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self> {
        let path = path.as_ref();
        let on_disk = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat '{}'", path.display()))?
            .len();
        let (size, bytes) = if on_disk > max_bytes {
            debug!(path = %path.display(), size = on_disk, max_bytes, "skipping read of oversized file");
            (on_disk, Vec::new())
        } else {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            (bytes.len() as u64, bytes)
        };
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            filename,
            source_path: Some(path.to_path_buf()),
            size,
            bytes: Arc::from(bytes),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        self.bytes.clone()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercased extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("ogg") => "audio/ogg",
            _ => "application/octet-stream",
        }
    }
}

/// Lightweight description of a held file, safe to hand to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub filename: String,
    pub size_bytes: u64,
}

impl From<&UploadFile> for FileSummary {
    fn from(file: &UploadFile) -> Self {
        Self {
            filename: file.filename.clone(),
            size_bytes: file.size(),
        }
    }
}
