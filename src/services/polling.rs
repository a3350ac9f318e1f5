//! Per-timeline poll timer registry.
//!
//! Each timeline id owns at most one poll task. Installing a new task for an
//! id aborts the previous one, including a tick that is mid-request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

/// Delay before each status poll, indexed by attempt and clamped to the last value.
pub const POLL_DELAYS_MS: [u64; 5] = [3_000, 6_000, 12_000, 24_000, 36_000];

/// Delay before poll number `attempt` (0-based).
pub fn poll_delay(attempt: usize) -> Duration {
    let index = attempt.min(POLL_DELAYS_MS.len() - 1);
    Duration::from_millis(POLL_DELAYS_MS[index])
}

struct PollSlot {
    generation: u64,
    attempt: usize,
    handle: AbortHandle,
}

/// Registry of outstanding poll tasks keyed by timeline id.
#[derive(Default)]
pub struct PollRegistry {
    slots: Mutex<HashMap<String, PollSlot>>,
    next_generation: AtomicU64,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a poll task for `timeline_id`, aborting any previous one.
    ///
    /// `spawn` receives the generation that identifies the new task; the task
    /// uses it to check it has not been superseded. The slot is written before
    /// the lock is released, so the task never observes a missing slot.
    pub fn install<F>(&self, timeline_id: &str, attempt: usize, spawn: F) -> u64
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slots = self.lock();

        if let Some(previous) = slots.remove(timeline_id) {
            debug!(
                "Replacing poll for {} (generation {} -> {})",
                timeline_id, previous.generation, generation
            );
            previous.handle.abort();
        }

        let handle = spawn(generation).abort_handle();
        slots.insert(
            timeline_id.to_string(),
            PollSlot {
                generation,
                attempt,
                handle,
            },
        );

        generation
    }

    /// Whether `generation` is still the live task for `timeline_id`.
    pub fn is_current(&self, timeline_id: &str, generation: u64) -> bool {
        self.lock()
            .get(timeline_id)
            .is_some_and(|slot| slot.generation == generation)
    }

    /// Record the next attempt for a live task. Returns false if superseded.
    pub fn advance(&self, timeline_id: &str, generation: u64, attempt: usize) -> bool {
        match self.lock().get_mut(timeline_id) {
            Some(slot) if slot.generation == generation => {
                slot.attempt = attempt;
                true
            }
            _ => false,
        }
    }

    /// Drop the slot of a task that ended on its own. Returns false if superseded.
    pub fn finish(&self, timeline_id: &str, generation: u64) -> bool {
        let mut slots = self.lock();
        match slots.get(timeline_id) {
            Some(slot) if slot.generation == generation => {
                slots.remove(timeline_id);
                true
            }
            _ => false,
        }
    }

    /// Abort the task for `timeline_id`. No-op if none is outstanding.
    pub fn cancel(&self, timeline_id: &str) -> bool {
        match self.lock().remove(timeline_id) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every outstanding task.
    pub fn cancel_all(&self) -> usize {
        let mut slots = self.lock();
        let count = slots.len();
        for (_, slot) in slots.drain() {
            slot.handle.abort();
        }
        count
    }

    pub fn is_scheduled(&self, timeline_id: &str) -> bool {
        self.lock().contains_key(timeline_id)
    }

    /// Attempt index of the next tick for `timeline_id`.
    pub fn attempt(&self, timeline_id: &str) -> Option<usize> {
        self.lock().get(timeline_id).map(|slot| slot.attempt)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PollSlot>> {
        // A panic while holding the lock leaves the map itself consistent
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PollRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
