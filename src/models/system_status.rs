//! Backend dependency status models.

use serde::{Deserialize, Serialize};

/// Embedding model state reported by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaDbStatus {
    pub model_name: String,
    pub model_dir: String,
    pub downloaded: bool,
    pub preloading: bool,
    pub model_size_mb: f64,
    /// One of `ready`, `downloading`, `not_started`.
    pub status: String,
}

/// ffmpeg availability on the backend host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegStatus {
    pub available: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub codecs: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// One of `ready`, `not_installed`.
    pub status: String,
    #[serde(default)]
    pub install_guide: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub chromadb: ChromaDbStatus,
    pub ffmpeg: FfmpegStatus,
}

impl SystemStatus {
    /// Both dependencies usable.
    pub fn is_ready(&self) -> bool {
        self.chromadb.status == "ready" && self.ffmpeg.available
    }
}
