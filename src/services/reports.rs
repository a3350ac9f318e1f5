//! Report retrieval and editing for the selected timeline.

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::draft_store::{DraftStore, MANUAL_MARKDOWN_KEY};
use super::notifier::Notifier;
use super::timelines::{TimelineManager, TimelineSnapshot};
use crate::api::GlassApi;
use crate::models::{DailyReport, TimelineEntry, TimelineStatus};

/// Notification texts for the report flows.
pub mod messages {
    pub const LOAD_FAILED: &str = "Could not load report";
    pub const SAVED: &str = "Report saved";
    pub const SAVE_FAILED: &str = "Save failed";
    pub const SELECT_FIRST: &str = "Select a timeline first";
    pub const UNKNOWN_TIMELINE: &str = "That timeline is no longer in the list";
    pub const REGENERATE_QUEUED: &str = "Regeneration triggered, queued for processing";
    pub const REGENERATE_FAILED: &str = "Could not trigger generation";
}

/// Report-side view state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportState {
    pub report: Option<DailyReport>,
    /// Editable draft shown in the composer.
    pub manual_markdown: String,
    pub saving: bool,
    pub generating: bool,
}

struct ReportInner {
    api: Arc<dyn GlassApi>,
    notifier: Notifier,
    timelines: TimelineManager,
    drafts: Option<DraftStore>,
    state: watch::Sender<ReportState>,
    watcher: Mutex<Option<AbortHandle>>,
    fetch: Mutex<Option<AbortHandle>>,
}

impl ReportInner {
    fn update<F: FnOnce(&mut ReportState)>(&self, f: F) {
        self.state.send_modify(f);
    }

    async fn persist_draft(&self, markdown: &str) {
        if let Some(ref drafts) = self.drafts
            && let Err(e) = drafts.set(MANUAL_MARKDOWN_KEY, &markdown).await
        {
            warn!("Failed to persist draft: {}", e);
        }
    }

    async fn set_draft(&self, markdown: String) {
        self.persist_draft(&markdown).await;
        self.update(|state| state.manual_markdown = markdown);
    }

    /// Replace the in-flight report fetch, aborting the previous one.
    fn replace_fetch(&self, handle: Option<AbortHandle>) {
        let mut fetch = self.fetch.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = std::mem::replace(&mut *fetch, handle) {
            previous.abort();
        }
    }

    /// Install a fetched or saved report if it still belongs to the selection.
    async fn accept_report(&self, timeline_id: &str, report: DailyReport) -> bool {
        let snapshot = self.timelines.snapshot();
        let still_selected = snapshot.selected.as_deref() == Some(timeline_id)
            && snapshot
                .selected_entry()
                .is_some_and(|e| e.status == TimelineStatus::Completed);
        if !still_selected {
            debug!("Discarding report for {}, selection moved on", timeline_id);
            return false;
        }
        let markdown = report.editable_markdown();
        self.persist_draft(&markdown).await;
        self.update(|state| {
            state.report = Some(report);
            state.manual_markdown = markdown;
        });
        true
    }
}

/// Holds the report for the selected timeline and the user's markdown draft.
#[derive(Clone)]
pub struct ReportManager {
    inner: Arc<ReportInner>,
}

impl ReportManager {
    pub fn new(
        api: Arc<dyn GlassApi>,
        notifier: Notifier,
        timelines: TimelineManager,
        drafts: Option<DraftStore>,
    ) -> Self {
        let (state, _) = watch::channel(ReportState::default());
        Self {
            inner: Arc::new(ReportInner {
                api,
                notifier,
                timelines,
                drafts,
                state,
                watcher: Mutex::new(None),
                fetch: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReportState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ReportState {
        self.inner.state.borrow().clone()
    }

    pub fn report(&self) -> Option<DailyReport> {
        self.inner.state.borrow().report.clone()
    }

    pub fn manual_markdown(&self) -> String {
        self.inner.state.borrow().manual_markdown.clone()
    }

    /// Replace the draft with a non-empty persisted one. Returns true if restored.
    pub fn restore_draft(&self) -> bool {
        let Some(ref drafts) = self.inner.drafts else {
            return false;
        };
        match drafts.get::<String>(MANUAL_MARKDOWN_KEY) {
            Some(markdown) if !markdown.is_empty() => {
                debug!("Restored {} bytes of draft markdown", markdown.len());
                self.inner.update(|state| state.manual_markdown = markdown);
                true
            }
            _ => false,
        }
    }

    /// Edit the draft. Persisted locally, not sent to the server.
    pub async fn set_manual_markdown(&self, markdown: impl Into<String>) {
        self.inner.set_draft(markdown.into()).await;
    }

    /// Append a highlight to the draft as a markdown bullet.
    pub async fn insert_highlight(&self, title: &str, summary: Option<&str>) {
        let draft = append_highlight(&self.manual_markdown(), title, summary);
        self.inner.set_draft(draft).await;
    }

    /// Reset the draft to the auto-generated markdown. Local only.
    pub async fn reset(&self) {
        let markdown = self
            .report()
            .map(|report| report.auto_markdown_or_empty())
            .unwrap_or_default();
        self.inner.set_draft(markdown).await;
    }

    /// Bring the held report in line with the current selection.
    ///
    /// Clears the report unless the selected entry is `completed`; otherwise
    /// fetches it.
    pub async fn sync(&self) {
        let snapshot = self.inner.timelines.snapshot();
        let target = match snapshot.selected_entry() {
            Some(entry) if entry.status == TimelineStatus::Completed => {
                Some(entry.timeline_id().to_string())
            }
            _ => None,
        };

        match target {
            None => self.inner.update(|state| state.report = None),
            Some(timeline_id) => self.load(&timeline_id).await,
        }
    }

    async fn load(&self, timeline_id: &str) {
        // A report for another timeline is never shown while this one loads
        self.inner.update(|state| {
            if state
                .report
                .as_ref()
                .is_some_and(|r| r.timeline_id != timeline_id)
            {
                state.report = None;
            }
        });

        match self.inner.api.report(timeline_id).await {
            Ok(report) => {
                if self.inner.accept_report(timeline_id, report).await {
                    info!("Loaded report for {}", timeline_id);
                }
            }
            Err(e) => {
                warn!("Failed to load report for {}: {}", timeline_id, e);
                self.inner
                    .notifier
                    .warning(e.user_message(messages::LOAD_FAILED));
            }
        }
    }

    /// Send the draft to the server.
    ///
    /// Only a report belonging to the selected timeline is saved. On failure
    /// the draft and the held report are left as they were.
    pub async fn save(&self) -> bool {
        let Some(timeline_id) = self.inner.timelines.selected() else {
            return false;
        };
        let (report, markdown) = {
            let state = self.inner.state.borrow();
            match state.report {
                Some(ref report) => (report.clone(), state.manual_markdown.clone()),
                None => return false,
            }
        };
        if report.timeline_id != timeline_id {
            debug!(
                "Not saving report for {} while {} is selected",
                report.timeline_id, timeline_id
            );
            return false;
        }

        self.inner.update(|state| state.saving = true);
        let result = self
            .inner
            .api
            .save_report(&timeline_id, &markdown, &report.manual_metadata)
            .await;
        self.inner.update(|state| state.saving = false);

        match result {
            Ok(updated) => {
                self.inner.accept_report(&timeline_id, updated).await;
                self.inner.notifier.success(messages::SAVED);
                true
            }
            Err(e) => {
                warn!("Failed to save report for {}: {}", timeline_id, e);
                self.inner
                    .notifier
                    .error(e.user_message(messages::SAVE_FAILED));
                false
            }
        }
    }

    /// Ask the backend to rebuild the selected timeline's report.
    ///
    /// On success the report is cleared and the timeline goes back to
    /// `processing` with polling restarted from the first delay.
    pub async fn regenerate(&self) -> bool {
        let Some(timeline_id) = self.inner.timelines.selected() else {
            self.inner.notifier.warning(messages::SELECT_FIRST);
            return false;
        };
        if self.inner.timelines.entry(&timeline_id).is_none() {
            self.inner.notifier.error(messages::UNKNOWN_TIMELINE);
            return false;
        }

        self.inner.update(|state| state.generating = true);
        let result = self.inner.api.generate_report(&timeline_id).await;
        self.inner.update(|state| state.generating = false);

        match result {
            Ok(response) => {
                info!(
                    "Regeneration requested for {} (backend status: {})",
                    timeline_id, response.status
                );
                self.inner.update(|state| state.report = None);
                self.inner.timelines.restart_processing(&timeline_id);
                self.inner.notifier.info(messages::REGENERATE_QUEUED);
                true
            }
            Err(e) => {
                warn!("Failed to trigger generation for {}: {}", timeline_id, e);
                self.inner
                    .notifier
                    .error(e.user_message(messages::REGENERATE_FAILED));
                false
            }
        }
    }

    /// Whether regeneration can be offered for the selected timeline.
    pub fn can_generate(&self) -> bool {
        generation_allowed(self.inner.timelines.selected_entry().as_ref())
    }

    /// Follow selection and status changes of the timeline list.
    ///
    /// Syncs once immediately, then whenever the selected id or the selected
    /// entry's status changes. Each sync runs in its own task and replaces
    /// the one still in flight. Calling `start` again replaces the watcher.
    pub fn start(&self) {
        let weak = Arc::downgrade(&self.inner);
        let receiver = self.inner.timelines.subscribe();
        let handle = tokio::spawn(watch_selection(weak, receiver)).abort_handle();

        let mut watcher = self.inner.watcher.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = watcher.replace(handle) {
            previous.abort();
        }
    }

    /// Stop following the timeline list. Idempotent.
    pub fn dispose(&self) {
        let mut watcher = self.inner.watcher.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = watcher.take() {
            handle.abort();
        }
        self.inner.replace_fetch(None);
    }
}

/// Generation is blocked while nothing is selected or work is still in flight.
pub fn generation_allowed(entry: Option<&TimelineEntry>) -> bool {
    entry.is_some_and(|entry| !entry.status.is_busy())
}

/// Append `- title` (and an indented summary line) after a blank line.
pub fn append_highlight(draft: &str, title: &str, summary: Option<&str>) -> String {
    let base = draft.trim_end();
    let mut lines = vec![format!("- {}", title)];
    if let Some(summary) = summary.map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(format!("  - {}", summary));
    }

    if base.is_empty() {
        lines.join("\n")
    } else {
        format!("{}\n\n{}", base, lines.join("\n"))
    }
}

fn selection_key(snapshot: &TimelineSnapshot) -> (Option<String>, Option<TimelineStatus>) {
    (
        snapshot.selected.clone(),
        snapshot.selected_entry().map(|e| e.status.clone()),
    )
}

async fn watch_selection(weak: Weak<ReportInner>, mut receiver: watch::Receiver<TimelineSnapshot>) {
    let mut last_key = None;
    loop {
        let key = selection_key(&receiver.borrow_and_update());
        if last_key.as_ref() != Some(&key) {
            last_key = Some(key);
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = ReportManager {
                inner: inner.clone(),
            };
            let handle = tokio::spawn(async move { manager.sync().await }).abort_handle();
            inner.replace_fetch(Some(handle));
        }

        if receiver.changed().await.is_err() {
            return;
        }
    }
}
