//! Daily report domain models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Labeled, time-stamped snippet pulled out of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineHighlight {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    /// Source modality (e.g., video, audio, image).
    pub modality: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub segment_start: Option<f64>,
    #[serde(default)]
    pub segment_end: Option<f64>,
    #[serde(default)]
    pub context_id: Option<String>,
}

/// Key frame with caption and time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualCard {
    pub image_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub segment_start: Option<f64>,
    #[serde(default)]
    pub segment_end: Option<f64>,
}

/// AI-generated diary report for a completed timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub timeline_id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub auto_markdown: Option<String>,
    #[serde(default)]
    pub manual_markdown: Option<String>,
    #[serde(default)]
    pub rendered_html: Option<String>,
    #[serde(default)]
    pub highlights: Vec<TimelineHighlight>,
    #[serde(default)]
    pub visual_cards: Vec<VisualCard>,
    /// Opaque bag persisted back to the server on save.
    #[serde(default)]
    pub manual_metadata: Map<String, JsonValue>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DailyReport {
    /// Initial text for the editable draft: manual copy, then auto copy, then empty.
    pub fn editable_markdown(&self) -> String {
        non_empty(self.manual_markdown.as_deref())
            .or_else(|| non_empty(self.auto_markdown.as_deref()))
            .unwrap_or_default()
            .to_string()
    }

    /// Auto-generated narrative, or empty.
    pub fn auto_markdown_or_empty(&self) -> String {
        self.auto_markdown.clone().unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Body of `PUT /glass/report/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReportRequest<'a> {
    pub manual_markdown: &'a str,
    pub manual_metadata: &'a Map<String, JsonValue>,
}

/// Payload of `POST /glass/report/{id}/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReportResponse {
    pub timeline_id: String,
    pub status: String,
}
