//! Server-declared upload limits, fetched once per session.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

use super::notifier::Notifier;
use crate::api::GlassApi;
use crate::models::UploadLimits;

pub const LIMITS_FAILED: &str = "Could not load upload limits";

#[derive(Debug, Default)]
struct LimitsState {
    limits: Option<UploadLimits>,
    loading: bool,
}

/// Advisory upload limits. Failure to load never blocks uploads.
#[derive(Clone)]
pub struct UploadLimitsLoader {
    api: Arc<dyn GlassApi>,
    notifier: Notifier,
    state: Arc<Mutex<LimitsState>>,
}

impl UploadLimitsLoader {
    pub fn new(api: Arc<dyn GlassApi>, notifier: Notifier) -> Self {
        Self {
            api,
            notifier,
            state: Arc::new(Mutex::new(LimitsState::default())),
        }
    }

    /// Fetch the limits; also used to reload.
    pub async fn load(&self) -> Option<UploadLimits> {
        self.with_state(|state| state.loading = true);
        let result = self.api.upload_limits().await;

        match result {
            Ok(limits) => {
                info!("Upload limits: {}", limits.describe());
                self.with_state(|state| {
                    state.limits = Some(limits.clone());
                    state.loading = false;
                });
                Some(limits)
            }
            Err(e) => {
                error!("Failed to load upload limits: {}", e);
                self.with_state(|state| state.loading = false);
                self.notifier.error(e.user_message(LIMITS_FAILED));
                None
            }
        }
    }

    pub fn limits(&self) -> Option<UploadLimits> {
        self.state.lock().ok().and_then(|state| state.limits.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().map(|state| state.loading).unwrap_or(false)
    }

    fn with_state<F: FnOnce(&mut LimitsState)>(&self, f: F) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state);
    }
}
