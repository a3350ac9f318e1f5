//! reqwest implementation of the backend API.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::GlassApi;
use super::envelope;
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    ChromaDbStatus, DailyReport, FfmpegStatus, GenerateReportResponse, SaveReportRequest,
    StatusPayload, SystemStatus, TimelineRecord, TimelineStatus, UploadFile, UploadLimits,
    UploadResponse,
};

const JSON_ACCEPT: &str = "application/json";

/// Multipart field name the backend reads the asset from.
const UPLOAD_FIELD: &str = "file";

/// HTTP client for the Glass backend.
#[derive(Clone)]
pub struct HttpGlassApi {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpGlassApi {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::with_client(&config.backend_url, http_client))
    }

    /// Create a client around an existing reqwest client.
    pub fn with_client(base_url: &str, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn report_url(&self, timeline_id: &str) -> String {
        self.url(&format!("/glass/report/{}", urlencoding::encode(timeline_id)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> ClientResult<T> {
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, JSON_ACCEPT)
            .send()
            .await?;
        envelope::read(response).await
    }
}

#[async_trait]
impl GlassApi for HttpGlassApi {
    async fn upload_limits(&self) -> ClientResult<UploadLimits> {
        self.get_json(self.url("/glass/uploads/limits")).await
    }

    async fn list_timelines(&self) -> ClientResult<Vec<TimelineRecord>> {
        self.get_json(self.url("/glass/timelines")).await
    }

    async fn upload(&self, file: &UploadFile) -> ClientResult<UploadResponse> {
        let mut part = Part::bytes(file.content.clone()).file_name(file.filename.clone());
        if let Some(ref content_type) = file.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                ClientError::InvalidInput(format!("Invalid content type '{}': {}", content_type, e))
            })?;
        }
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.url("/glass/upload");
        debug!("POST {} ({}, {} bytes)", url, file.filename, file.content.len());
        let response = self
            .http_client
            .post(url)
            .header(ACCEPT, JSON_ACCEPT)
            .multipart(form)
            .send()
            .await?;
        envelope::read(response).await
    }

    async fn status(&self, timeline_id: &str) -> ClientResult<TimelineStatus> {
        let url = self.url(&format!("/glass/status/{}", urlencoding::encode(timeline_id)));
        let payload: StatusPayload = self.get_json(url).await?;
        Ok(payload.status)
    }

    async fn report(&self, timeline_id: &str) -> ClientResult<DailyReport> {
        self.get_json(self.report_url(timeline_id)).await
    }

    async fn save_report(
        &self,
        timeline_id: &str,
        manual_markdown: &str,
        manual_metadata: &Map<String, JsonValue>,
    ) -> ClientResult<DailyReport> {
        let url = self.report_url(timeline_id);
        debug!("PUT {}", url);
        let response = self
            .http_client
            .put(url)
            .header(ACCEPT, JSON_ACCEPT)
            .json(&SaveReportRequest {
                manual_markdown,
                manual_metadata,
            })
            .send()
            .await?;
        envelope::read(response).await
    }

    async fn generate_report(&self, timeline_id: &str) -> ClientResult<GenerateReportResponse> {
        let url = format!("{}/generate", self.report_url(timeline_id));
        debug!("POST {}", url);
        let response = self
            .http_client
            .post(url)
            .header(ACCEPT, JSON_ACCEPT)
            .send()
            .await?;
        envelope::read(response).await
    }

    async fn system_status(&self) -> ClientResult<SystemStatus> {
        let (chromadb, ffmpeg) = tokio::try_join!(
            self.get_json::<ChromaDbStatus>(self.url("/api/monitoring/chromadb-status")),
            self.get_json::<FfmpegStatus>(self.url("/api/monitoring/ffmpeg-status")),
        )?;
        Ok(SystemStatus { chromadb, ffmpeg })
    }
}
