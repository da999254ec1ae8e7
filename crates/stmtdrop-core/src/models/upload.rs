use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// The only media type accepted by the statement ingestion endpoint.
pub const PDF_MIME: &str = "application/pdf";

/// Where the bytes of a candidate file come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Bytes),
    Path(PathBuf),
}

/// A user-selected file: name, declared MIME type, size and a handle to its bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    /// MIME type as declared by the drag payload or file picker, not sniffed.
    pub content_type: String,
    pub size: u64,
    pub source: FileSource,
}

impl UploadFile {
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            source: FileSource::Memory(data),
        }
    }

    /// Reference a file on disk. The MIME type is derived from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("statement.pdf")
            .to_string();

        Ok(Self {
            content_type: content_type_for_name(&name).to_string(),
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Read at most `limit` leading bytes.
    pub async fn read_head(&self, limit: usize) -> io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(data) => Ok(data.slice(..limit.min(data.len()))),
            FileSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                let mut buf = Vec::with_capacity(limit.min(self.size as usize));
                file.take(limit as u64).read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }

    pub async fn read_all(&self) -> io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(data) => Ok(data.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// Map a file name to the MIME type a browser would declare for it.
pub fn content_type_for_name(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Body returned by `POST /projects/{id}/statements` on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatementsResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
