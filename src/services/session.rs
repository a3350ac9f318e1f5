//! Session wiring: one API client, one notifier, and the state containers
//! that share them.

use std::sync::Arc;

use tracing::{info, warn};

use super::draft_store::DraftStore;
use super::notifier::Notifier;
use super::reports::ReportManager;
use super::timelines::TimelineManager;
use super::upload_limits::UploadLimitsLoader;
use crate::api::{GlassApi, HttpGlassApi};
use crate::config::Config;
use crate::error::ClientResult;
use crate::models::{DailyReport, SystemStatus, UploadLimits};

#[derive(Clone)]
pub struct GlassSession {
    api: Arc<dyn GlassApi>,
    notifier: Notifier,
    timelines: TimelineManager,
    reports: ReportManager,
    limits: UploadLimitsLoader,
}

impl GlassSession {
    pub fn new(api: Arc<dyn GlassApi>, drafts: Option<DraftStore>) -> Self {
        let notifier = Notifier::new();
        let timelines = TimelineManager::new(api.clone(), notifier.clone());
        let reports = ReportManager::new(api.clone(), notifier.clone(), timelines.clone(), drafts);
        let limits = UploadLimitsLoader::new(api.clone(), notifier.clone());

        Self {
            api,
            notifier,
            timelines,
            reports,
            limits,
        }
    }

    /// Build a session talking HTTP to the configured backend.
    pub async fn from_config(config: &Config) -> ClientResult<Self> {
        let api = HttpGlassApi::new(config)?;
        let drafts = DraftStore::open_or_empty(&config.draft_path).await;
        info!(
            "Glass session for {} (drafts: {})",
            config.backend_url,
            drafts.path().display()
        );
        Ok(Self::new(Arc::new(api), Some(drafts)))
    }

    /// Restore the local draft, follow the selection, and load limits and
    /// history. Returns the loaded upload limits, if any.
    pub async fn start(&self) -> Option<UploadLimits> {
        self.reports.restore_draft();
        self.reports.start();

        let (limits, history) = tokio::join!(self.limits.load(), self.timelines.load_history());
        info!("Session started with {} timelines", history);
        limits
    }

    /// Load history and fetch one timeline's report without following the
    /// selection afterwards. `None` if the timeline is unknown or has no
    /// report yet.
    pub async fn open_report(&self, timeline_id: &str) -> Option<DailyReport> {
        self.reports.restore_draft();
        self.timelines.load_history().await;
        if self.timelines.entry(timeline_id).is_none() {
            warn!("Timeline {} is not in the history", timeline_id);
            return None;
        }

        self.timelines.select(Some(timeline_id.to_string()));
        self.reports.sync().await;
        self.reports.report()
    }

    /// Cancel every poll and stop following the selection. Idempotent.
    pub fn dispose(&self) {
        self.timelines.dispose();
        self.reports.dispose();
    }

    /// Backend dependency status; failures are surfaced as a notification.
    pub async fn system_status(&self) -> Option<SystemStatus> {
        match self.api.system_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Failed to load system status: {}", e);
                self.notifier
                    .error(e.user_message("Could not load system status"));
                None
            }
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn timelines(&self) -> &TimelineManager {
        &self.timelines
    }

    pub fn reports(&self) -> &ReportManager {
        &self.reports
    }

    pub fn limits(&self) -> &UploadLimitsLoader {
        &self.limits
    }
}
