//! Backend API client.
//!
//! `GlassApi` is the seam between the state containers and the backend;
//! `HttpGlassApi` is the reqwest implementation, tests substitute doubles.

pub mod client;
pub mod envelope;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::ClientResult;
use crate::models::{
    DailyReport, GenerateReportResponse, SystemStatus, TimelineRecord, TimelineStatus, UploadFile,
    UploadLimits, UploadResponse,
};

pub use client::HttpGlassApi;

/// Operations the Glass backend exposes to the client.
#[async_trait]
pub trait GlassApi: Send + Sync {
    /// `GET /glass/uploads/limits`
    async fn upload_limits(&self) -> ClientResult<UploadLimits>;

    /// `GET /glass/timelines`
    async fn list_timelines(&self) -> ClientResult<Vec<TimelineRecord>>;

    /// `POST /glass/upload` (multipart field `file`)
    async fn upload(&self, file: &UploadFile) -> ClientResult<UploadResponse>;

    /// `GET /glass/status/{timeline_id}`
    async fn status(&self, timeline_id: &str) -> ClientResult<TimelineStatus>;

    /// `GET /glass/report/{timeline_id}`
    async fn report(&self, timeline_id: &str) -> ClientResult<DailyReport>;

    /// `PUT /glass/report/{timeline_id}`
    async fn save_report(
        &self,
        timeline_id: &str,
        manual_markdown: &str,
        manual_metadata: &Map<String, JsonValue>,
    ) -> ClientResult<DailyReport>;

    /// `POST /glass/report/{timeline_id}/generate`
    async fn generate_report(&self, timeline_id: &str) -> ClientResult<GenerateReportResponse>;

    /// Vector store and ffmpeg status, fetched together.
    async fn system_status(&self) -> ClientResult<SystemStatus>;
}
