use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::FileKind;
use crate::error::{ResumeError, Result};

#[derive(Debug, Clone)]
enum FileSource {
    Memory(Arc<[u8]>),
    Disk(PathBuf),
}

/// An immutable resume upload.
///
/// Content is only materialised by [`UploadedFile::read_bytes`], so callers can
/// check the declared size before touching the bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    mime_type: String,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
    source: FileSource,
}

impl UploadedFile {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            last_modified: None,
            source: FileSource::Memory(bytes),
        }
    }

    /// Describe a file on disk without reading it. The MIME type is guessed
    /// from the extension when not supplied.
    pub async fn from_path(path: impl AsRef<Path>, mime_type: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ResumeError::Read(format!("Failed to stat {}: {e}", path.display())))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = match mime_type {
            Some(mime) => mime.to_string(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        Ok(Self {
            name,
            mime_type,
            size: metadata.len(),
            last_modified,
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_declared(&self.mime_type, &self.name)
    }

    /// Read the full content. A byte count that disagrees with the declared
    /// size is reported as a short read.
    pub async fn read_bytes(&self) -> Result<Arc<[u8]>> {
        let bytes: Arc<[u8]> = match &self.source {
            FileSource::Memory(bytes) => Arc::clone(bytes),
            FileSource::Disk(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ResumeError::Read(format!("Failed to read {}: {e}", path.display())))?
                .into(),
        };

        if bytes.len() as u64 != self.size {
            return Err(ResumeError::Read(format!(
                "Short read for {}: expected {} bytes, got {}",
                self.name,
                self.size,
                bytes.len()
            )));
        }

        Ok(bytes)
    }
}
