//! Upload models.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::TimelineStatus;

/// Server-declared upload constraints, used for advisory text only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadLimits {
    pub max_size_mb: u64,
    #[serde(default)]
    pub allowed_types: Vec<String>,
    pub max_concurrent: u32,
}

impl UploadLimits {
    /// One-line description for display next to the upload control.
    pub fn describe(&self) -> String {
        let types = if self.allowed_types.is_empty() {
            "any type".to_string()
        } else {
            self.allowed_types.join(", ")
        };
        format!(
            "Up to {}MB per file ({}), {} at a time",
            self.max_size_mb, types, self.max_concurrent
        )
    }
}

/// Payload of `POST /glass/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub timeline_id: String,
    pub status: TimelineStatus,
}

/// A local file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
            content_type: None,
        }
    }

    /// Read a file from disk; the MIME type is inferred from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = content_type_for(&filename).map(str::to_string);

        Ok(Self {
            filename,
            content,
            content_type,
        })
    }
}

/// MIME type for common photo/video extensions.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" => Some("image/heic"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
