//! Timeline list state and the upload / status polling state machine.
//!
//! The entry list is published as an immutable snapshot through a watch
//! channel. Every mutation builds a new `Arc<Vec<TimelineEntry>>` and swaps
//! it in, so readers never see a half-applied change.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::notifier::Notifier;
use super::polling::{PollRegistry, poll_delay};
use crate::api::GlassApi;
use crate::models::{EntryId, TimelineEntry, TimelineStatus, UploadFile, UploadResponse};

/// Notification texts for the polling and upload flows.
pub mod messages {
    pub const PROCESSING_COMPLETE: &str = "Processing complete, loading report";
    pub const PROCESSING_FAILED: &str = "Processing failed, check the server logs";
    pub const UPLOAD_QUEUED: &str = "Upload succeeded, queued for processing";
    pub const UPLOAD_FAILED: &str = "Upload failed";
    pub const STATUS_CHECK_FAILED: &str = "Status check failed";
}

/// Point-in-time view of the timeline list and the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineSnapshot {
    /// Most recent first.
    pub entries: Arc<Vec<TimelineEntry>>,
    pub selected: Option<String>,
}

impl TimelineSnapshot {
    pub fn find(&self, timeline_id: &str) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.timeline_id() == timeline_id)
    }

    pub fn selected_entry(&self) -> Option<&TimelineEntry> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }
}

struct TimelineInner {
    api: Arc<dyn GlassApi>,
    notifier: Notifier,
    state: watch::Sender<TimelineSnapshot>,
    polls: PollRegistry,
}

impl TimelineInner {
    /// Swap in a new entry list computed from the current one.
    fn replace_entries<F>(&self, f: F) -> bool
    where
        F: FnOnce(&[TimelineEntry]) -> Option<Vec<TimelineEntry>>,
    {
        self.state.send_if_modified(|snapshot| match f(&snapshot.entries) {
            Some(entries) => {
                snapshot.entries = Arc::new(entries);
                true
            }
            None => false,
        })
    }

    /// Insert an uploading placeholder at the head of the list.
    fn insert_placeholder(&self, filename: &str) -> String {
        let mut inserted = String::new();
        self.replace_entries(|entries| {
            let mut placeholder = TimelineEntry::placeholder(filename);
            while entries.iter().any(|e| e.id == placeholder.id) {
                placeholder.id = EntryId::placeholder();
            }
            inserted = placeholder.timeline_id().to_string();

            let mut next = Vec::with_capacity(entries.len() + 1);
            next.push(placeholder);
            next.extend(entries.iter().cloned());
            Some(next)
        });
        inserted
    }

    /// Re-key a placeholder under the server id in place.
    fn register_placeholder(&self, local_id: &str, response: &UploadResponse) -> bool {
        self.replace_entries(|entries| {
            let position = entries
                .iter()
                .position(|e| e.id.is_pending() && e.timeline_id() == local_id)?;
            let registered =
                entries[position].registered(&response.timeline_id, response.status.clone());

            let next = entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| {
                    if index == position {
                        Some(registered.clone())
                    } else if entry.timeline_id() == response.timeline_id {
                        // Server ids stay unique within the list
                        None
                    } else {
                        Some(entry.clone())
                    }
                })
                .collect();
            Some(next)
        })
    }

    fn remove_entry(&self, timeline_id: &str) -> bool {
        self.replace_entries(|entries| {
            if !entries.iter().any(|e| e.timeline_id() == timeline_id) {
                return None;
            }
            Some(
                entries
                    .iter()
                    .filter(|e| e.timeline_id() != timeline_id)
                    .cloned()
                    .collect(),
            )
        })
    }

    fn patch_status(&self, timeline_id: &str, status: &TimelineStatus) -> bool {
        self.replace_entries(|entries| {
            let current = entries.iter().find(|e| e.timeline_id() == timeline_id)?;
            if &current.status == status {
                return None;
            }
            Some(
                entries
                    .iter()
                    .map(|e| {
                        if e.timeline_id() == timeline_id {
                            TimelineEntry {
                                status: status.clone(),
                                ..e.clone()
                            }
                        } else {
                            e.clone()
                        }
                    })
                    .collect(),
            )
        })
    }

    fn select(&self, timeline_id: Option<String>) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.selected == timeline_id {
                return false;
            }
            snapshot.selected = timeline_id;
            true
        });
    }
}

/// Owns the timeline list, the selection, and one poll task per processing timeline.
#[derive(Clone)]
pub struct TimelineManager {
    inner: Arc<TimelineInner>,
}

impl TimelineManager {
    pub fn new(api: Arc<dyn GlassApi>, notifier: Notifier) -> Self {
        let (state, _) = watch::channel(TimelineSnapshot::default());
        Self {
            inner: Arc::new(TimelineInner {
                api,
                notifier,
                state,
                polls: PollRegistry::new(),
            }),
        }
    }

    /// Receive every future snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TimelineSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn entries(&self) -> Arc<Vec<TimelineEntry>> {
        self.inner.state.borrow().entries.clone()
    }

    pub fn entry(&self, timeline_id: &str) -> Option<TimelineEntry> {
        self.inner.state.borrow().find(timeline_id).cloned()
    }

    pub fn selected(&self) -> Option<String> {
        self.inner.state.borrow().selected.clone()
    }

    pub fn selected_entry(&self) -> Option<TimelineEntry> {
        self.inner.state.borrow().selected_entry().cloned()
    }

    /// Change the selected timeline; `None` clears it.
    pub fn select(&self, timeline_id: Option<String>) {
        self.inner.select(timeline_id);
    }

    /// Load historical timelines from the backend.
    ///
    /// Entries created locally that the backend does not list yet stay at the
    /// head. Failures are only logged.
    pub async fn load_history(&self) -> usize {
        let records = match self.inner.api.list_timelines().await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to load historical timelines: {}", e);
                return 0;
            }
        };

        let history: Vec<TimelineEntry> = records.into_iter().map(TimelineEntry::from).collect();
        let count = history.len();

        self.inner.replace_entries(|entries| {
            let known: HashSet<&str> = history.iter().map(|e| e.timeline_id()).collect();
            let mut next: Vec<TimelineEntry> = entries
                .iter()
                .filter(|e| !known.contains(e.timeline_id()))
                .cloned()
                .collect();
            let mut seen = HashSet::new();
            next.extend(
                history
                    .iter()
                    .filter(|e| seen.insert(e.timeline_id().to_string()))
                    .cloned(),
            );
            Some(next)
        });

        info!("Loaded {} historical timelines", count);
        count
    }

    /// Patch the status of one entry. Returns false if the id is unknown or unchanged.
    pub fn update_status(&self, timeline_id: &str, status: TimelineStatus) -> bool {
        self.inner.patch_status(timeline_id, &status)
    }

    /// Upload files one at a time, in order.
    ///
    /// Each file appears as an `uploading` placeholder before its request is
    /// sent. A failed upload removes its placeholder and does not stop the batch.
    pub async fn upload_files<I>(&self, files: I) -> Vec<Option<String>>
    where
        I: IntoIterator<Item = UploadFile>,
    {
        let mut results = Vec::new();
        for file in files {
            results.push(self.upload_file(file).await);
        }
        results
    }

    /// Upload a single file. Returns the server timeline id on success.
    pub async fn upload_file(&self, file: UploadFile) -> Option<String> {
        let local_id = self.inner.insert_placeholder(&file.filename);
        info!("Uploading {} as {}", file.filename, local_id);

        let response = match self.inner.api.upload(&file).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Upload of {} failed: {}", file.filename, e);
                self.inner.remove_entry(&local_id);
                self.inner
                    .notifier
                    .error(e.user_message(messages::UPLOAD_FAILED));
                return None;
            }
        };

        if !self.inner.register_placeholder(&local_id, &response) {
            // Placeholder vanished (history reload or dispose race); keep the server entry
            warn!(
                "Placeholder {} missing when registering {}",
                local_id, response.timeline_id
            );
        }
        info!(
            "Upload of {} registered as {} ({})",
            file.filename, response.timeline_id, response.status
        );

        match response.status {
            TimelineStatus::Completed => {
                self.inner.notifier.success(messages::PROCESSING_COMPLETE);
                self.select(Some(response.timeline_id.clone()));
            }
            TimelineStatus::Failed => {
                self.inner.notifier.error(messages::PROCESSING_FAILED);
            }
            _ => {
                self.schedule_poll(&response.timeline_id, 0);
                self.inner.notifier.info(messages::UPLOAD_QUEUED);
            }
        }

        Some(response.timeline_id)
    }

    /// Start polling `timeline_id` at `attempt`, replacing any outstanding poll for it.
    pub fn schedule_poll(&self, timeline_id: &str, attempt: usize) {
        let weak = Arc::downgrade(&self.inner);
        let id = timeline_id.to_string();
        self.inner.polls.install(timeline_id, attempt, move |generation| {
            tokio::spawn(poll_loop(weak, id, generation, attempt))
        });
        debug!(
            "Scheduled poll for {} in {:?} (attempt {})",
            timeline_id,
            poll_delay(attempt),
            attempt
        );
    }

    /// Mark a timeline as processing again and restart polling from attempt 0.
    pub fn restart_processing(&self, timeline_id: &str) {
        self.update_status(timeline_id, TimelineStatus::Processing);
        self.schedule_poll(timeline_id, 0);
    }

    /// Stop polling `timeline_id`. No-op if not polling.
    pub fn cancel_poll(&self, timeline_id: &str) -> bool {
        self.inner.polls.cancel(timeline_id)
    }

    pub fn is_polling(&self, timeline_id: &str) -> bool {
        self.inner.polls.is_scheduled(timeline_id)
    }

    /// Attempt index of the next poll for `timeline_id`.
    pub fn poll_attempt(&self, timeline_id: &str) -> Option<usize> {
        self.inner.polls.attempt(timeline_id)
    }

    pub fn pending_polls(&self) -> usize {
        self.inner.polls.len()
    }

    /// Cancel every outstanding poll.
    pub fn dispose(&self) {
        let cancelled = self.inner.polls.cancel_all();
        if cancelled > 0 {
            info!("Cancelled {} outstanding timeline polls", cancelled);
        }
    }
}

/// Poll one timeline until it reaches a terminal status, the query fails,
/// or the task is superseded.
async fn poll_loop(
    weak: Weak<TimelineInner>,
    timeline_id: String,
    generation: u64,
    mut attempt: usize,
) {
    loop {
        tokio::time::sleep(poll_delay(attempt)).await;

        // Strong reference lives for one tick only
        let Some(inner) = weak.upgrade() else {
            return;
        };

        let result = inner.api.status(&timeline_id).await;
        if !inner.polls.is_current(&timeline_id, generation) {
            return;
        }

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                error!("Status check for {} failed: {}", timeline_id, e);
                inner.polls.finish(&timeline_id, generation);
                inner
                    .notifier
                    .error(e.user_message(messages::STATUS_CHECK_FAILED));
                return;
            }
        };

        debug!("Poll {} for {}: {}", attempt, timeline_id, status);
        inner.patch_status(&timeline_id, &status);

        if status.is_terminal() {
            inner.polls.finish(&timeline_id, generation);
            if status == TimelineStatus::Completed {
                info!("Timeline {} completed", timeline_id);
                inner.notifier.success(messages::PROCESSING_COMPLETE);
            } else {
                warn!("Timeline {} failed", timeline_id);
                inner.notifier.error(messages::PROCESSING_FAILED);
            }
            return;
        }

        attempt += 1;
        if !inner.polls.advance(&timeline_id, generation, attempt) {
            return;
        }
    }
}
