//! State containers and the session that wires them together.

pub mod draft_store;
pub mod notifier;
pub mod polling;
pub mod reports;
pub mod session;
pub mod timelines;
pub mod upload_limits;

#[cfg(test)]
pub(crate) mod testing;

pub use draft_store::{DraftStore, DraftStoreError, MANUAL_MARKDOWN_KEY};
pub use notifier::Notifier;
pub use polling::{POLL_DELAYS_MS, PollRegistry, poll_delay};
pub use reports::{ReportManager, ReportState};
pub use session::GlassSession;
pub use timelines::{TimelineManager, TimelineSnapshot};
pub use upload_limits::UploadLimitsLoader;
