//! Scripted in-memory backend for state machine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};
use tokio::sync::{Semaphore, broadcast};
use tokio::time::Instant;

use crate::api::GlassApi;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    DailyReport, GenerateReportResponse, Notification, SystemStatus, TimelineRecord,
    TimelineStatus, Tone, UploadFile, UploadLimits, UploadResponse,
};

/// Backend double answering from per-endpoint queues.
///
/// An empty status queue answers `processing`; other empty queues answer 404.
#[derive(Default)]
pub struct ScriptedApi {
    limits: Mutex<VecDeque<ClientResult<UploadLimits>>>,
    timelines: Mutex<VecDeque<ClientResult<Vec<TimelineRecord>>>>,
    uploads: Mutex<VecDeque<ClientResult<UploadResponse>>>,
    statuses: Mutex<HashMap<String, VecDeque<ClientResult<TimelineStatus>>>>,
    reports: Mutex<HashMap<String, VecDeque<ClientResult<DailyReport>>>>,
    saves: Mutex<VecDeque<ClientResult<DailyReport>>>,
    generates: Mutex<VecDeque<ClientResult<GenerateReportResponse>>>,
    upload_gate: Mutex<Option<Arc<Semaphore>>>,
    report_gate: Mutex<Option<Arc<Semaphore>>>,
    status_calls: Mutex<Vec<(String, Instant)>>,
    upload_calls: Mutex<Vec<String>>,
    save_calls: Mutex<Vec<(String, String, Map<String, JsonValue>)>>,
    report_calls: Mutex<Vec<String>>,
}

fn not_found(what: &str) -> ClientError {
    ClientError::Api {
        status: 404,
        message: format!("{} not scripted", what),
    }
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold every upload until `release_upload` is called.
    pub fn gate_uploads(&self) {
        *self.upload_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_upload(&self) {
        if let Some(gate) = self.upload_gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Hold every report fetch until `release_report` is called.
    pub fn gate_reports(&self) {
        *self.report_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_report(&self) {
        if let Some(gate) = self.report_gate.lock().unwrap().as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn push_limits(&self, result: ClientResult<UploadLimits>) {
        self.limits.lock().unwrap().push_back(result);
    }

    pub fn push_timelines(&self, result: ClientResult<Vec<TimelineRecord>>) {
        self.timelines.lock().unwrap().push_back(result);
    }

    pub fn push_upload(&self, result: ClientResult<UploadResponse>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, timeline_id: &str, result: ClientResult<TimelineStatus>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(timeline_id.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_report(&self, timeline_id: &str, result: ClientResult<DailyReport>) {
        self.reports
            .lock()
            .unwrap()
            .entry(timeline_id.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_save(&self, result: ClientResult<DailyReport>) {
        self.saves.lock().unwrap().push_back(result);
    }

    pub fn push_generate(&self, result: ClientResult<GenerateReportResponse>) {
        self.generates.lock().unwrap().push_back(result);
    }

    /// Instants of every status query for `timeline_id`.
    pub fn status_calls(&self, timeline_id: &str) -> Vec<Instant> {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == timeline_id)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn upload_calls(&self) -> Vec<String> {
        self.upload_calls.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> Vec<(String, String, Map<String, JsonValue>)> {
        self.save_calls.lock().unwrap().clone()
    }

    pub fn report_calls(&self) -> Vec<String> {
        self.report_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GlassApi for ScriptedApi {
    async fn upload_limits(&self) -> ClientResult<UploadLimits> {
        self.limits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("limits")))
    }

    async fn list_timelines(&self) -> ClientResult<Vec<TimelineRecord>> {
        self.timelines
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn upload(&self, file: &UploadFile) -> ClientResult<UploadResponse> {
        self.upload_calls.lock().unwrap().push(file.filename.clone());
        let gate = self.upload_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("upload")))
    }

    async fn status(&self, timeline_id: &str) -> ClientResult<TimelineStatus> {
        self.status_calls
            .lock()
            .unwrap()
            .push((timeline_id.to_string(), Instant::now()));
        self.statuses
            .lock()
            .unwrap()
            .get_mut(timeline_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(TimelineStatus::Processing))
    }

    async fn report(&self, timeline_id: &str) -> ClientResult<DailyReport> {
        self.report_calls.lock().unwrap().push(timeline_id.to_string());
        let gate = self.report_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.reports
            .lock()
            .unwrap()
            .get_mut(timeline_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(not_found("report")))
    }

    async fn save_report(
        &self,
        timeline_id: &str,
        manual_markdown: &str,
        manual_metadata: &Map<String, JsonValue>,
    ) -> ClientResult<DailyReport> {
        self.save_calls.lock().unwrap().push((
            timeline_id.to_string(),
            manual_markdown.to_string(),
            manual_metadata.clone(),
        ));
        self.saves
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("save")))
    }

    async fn generate_report(&self, _timeline_id: &str) -> ClientResult<GenerateReportResponse> {
        self.generates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("generate")))
    }

    async fn system_status(&self) -> ClientResult<SystemStatus> {
        Err(not_found("system status"))
    }
}

pub fn upload_ok(timeline_id: &str, status: TimelineStatus) -> ClientResult<UploadResponse> {
    Ok(UploadResponse {
        timeline_id: timeline_id.to_string(),
        status,
    })
}

pub fn record(timeline_id: &str, status: &str) -> TimelineRecord {
    serde_json::from_value(json!({
        "timeline_id": timeline_id,
        "filename": format!("{}.mp4", timeline_id),
        "status": status,
        "started_at": 1_700_000_000_000i64,
    }))
    .expect("valid record")
}

pub fn report(timeline_id: &str, manual: Option<&str>, auto: Option<&str>) -> DailyReport {
    serde_json::from_value(json!({
        "timeline_id": timeline_id,
        "manual_markdown": manual,
        "auto_markdown": auto,
        "highlights": [],
        "visual_cards": [],
        "manual_metadata": { "weather": "sunny" },
    }))
    .expect("valid report")
}

pub fn generate_ok(timeline_id: &str) -> ClientResult<GenerateReportResponse> {
    Ok(GenerateReportResponse {
        timeline_id: timeline_id.to_string(),
        status: "processing".to_string(),
    })
}

pub fn api_error(status: u16, message: &str) -> ClientError {
    ClientError::Api {
        status,
        message: message.to_string(),
    }
}

pub fn transport_error() -> ClientError {
    ClientError::Transport("connection refused".to_string())
}

/// Let spawned tasks run to their next suspension point.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Everything broadcast since the last drain, as (tone, message).
pub fn drain(receiver: &mut broadcast::Receiver<Notification>) -> Vec<(Tone, String)> {
    let mut drained = Vec::new();
    while let Ok(notification) = receiver.try_recv() {
        drained.push((notification.tone, notification.message));
    }
    drained
}

/// Milliseconds between consecutive instants, starting from `origin`.
pub fn gaps_ms(origin: Instant, instants: &[Instant]) -> Vec<u64> {
    let mut previous = origin;
    instants
        .iter()
        .map(|at| {
            let gap = at.duration_since(previous);
            previous = *at;
            (gap.as_secs_f64() * 1000.0).round() as u64
        })
        .collect()
}
