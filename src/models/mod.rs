//! Domain models for the Glass timeline client.

pub mod daily_report;
pub mod notification;
pub mod system_status;
pub mod timeline;
pub mod upload;

// Re-export commonly used types
pub use daily_report::{
    DailyReport, GenerateReportResponse, SaveReportRequest, TimelineHighlight, VisualCard,
};
pub use notification::{Notification, Tone};
pub use system_status::{ChromaDbStatus, FfmpegStatus, SystemStatus};
pub use timeline::{EntryId, StatusPayload, TimelineEntry, TimelineRecord, TimelineStatus};
pub use upload::{UploadFile, UploadLimits, UploadResponse};
