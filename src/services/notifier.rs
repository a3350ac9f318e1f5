//! Notification fan-out for transient user messages.
//!
//! Uses tokio::sync::broadcast to fan-out notifications to every subscriber
//! and remembers the latest one for single-toast displays.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::models::{Notification, Tone};

/// Default capacity for the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Distributes notifications to all subscribers.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
    latest: Arc<Mutex<Option<Notification>>>,
}

impl Notifier {
    /// Create a new Notifier with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new Notifier with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to receive notifications.
    /// Returns a receiver that will receive all future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish a notification and mirror it into the log.
    /// Returns the number of receivers that received it.
    pub fn notify(&self, message: impl Into<String>, tone: Tone) -> usize {
        let notification = Notification::new(message, tone);

        match tone {
            Tone::Error => error!("[notify] {}", notification.message),
            Tone::Warning => warn!("[notify] {}", notification.message),
            _ => info!("[notify:{}] {}", tone, notification.message),
        }

        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(notification.clone());
        }

        // No subscribers is not an error
        self.sender.send(notification).unwrap_or(0)
    }

    pub fn info(&self, message: impl Into<String>) -> usize {
        self.notify(message, Tone::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> usize {
        self.notify(message, Tone::Success)
    }

    pub fn warning(&self, message: impl Into<String>) -> usize {
        self.notify(message, Tone::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> usize {
        self.notify(message, Tone::Error)
    }

    /// Most recent notification, if not cleared.
    pub fn latest(&self) -> Option<Notification> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }

    /// Dismiss the current notification.
    pub fn clear(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
