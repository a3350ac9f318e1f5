//! E2E tests: each backend endpoint through the HTTP client.

use glass_timeline_lib::api::GlassApi;
use glass_timeline_lib::models::{TimelineStatus, UploadFile};
use serde_json::{Map, json};

use super::mock_backend::MockGlassBackend;
use super::test_helpers::*;

#[actix_rt::test]
async fn test_upload_limits() {
    let mock = MockGlassBackend::start().await;
    let limits = api_for(&mock).upload_limits().await.unwrap();

    assert_eq!(limits.max_size_mb, 500);
    assert_eq!(limits.allowed_types, vec!["mp4", "mov", "jpg"]);
    assert_eq!(limits.max_concurrent, 3);
}

#[actix_rt::test]
async fn test_list_timelines_accepts_fractional_timestamps() {
    let mock = MockGlassBackend::start().await;
    mock.add_timeline("t-old", "beach.mov", "completed");
    mock.add_timeline("t-odd", "scan.jpg", "finalizing");

    let records = api_for(&mock).list_timelines().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].timeline_id, "t-old");
    assert_eq!(records[0].status, TimelineStatus::Completed);
    assert_eq!(records[0].started_at, 1_700_000_123_456);
    assert_eq!(records[0].has_report, Some(true));
    assert_eq!(
        records[1].status,
        TimelineStatus::Other("finalizing".to_string())
    );
}

#[actix_rt::test]
async fn test_upload_sends_multipart_file_field() {
    let mock = MockGlassBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    tokio::fs::write(&path, vec![7u8; 2048]).await.unwrap();

    let file = UploadFile::from_path(&path).await.unwrap();
    let response = api_for(&mock).upload(&file).await.unwrap();

    assert_eq!(response.timeline_id, "tl-1");
    assert_eq!(response.status, TimelineStatus::Processing);

    let uploads = mock.state.lock().unwrap().uploads.clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field_name.as_deref(), Some("file"));
    assert_eq!(uploads[0].filename.as_deref(), Some("clip.mp4"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("video/mp4"));
    assert_eq!(uploads[0].size, 2048);
}

#[actix_rt::test]
async fn test_status_unwraps_data_status() {
    let mock = MockGlassBackend::start().await;
    mock.add_timeline("t1", "clip.mp4", "processing");
    mock.script_statuses("t1", &["processing", "completed"]);
    let api = api_for(&mock);

    assert_eq!(api.status("t1").await.unwrap(), TimelineStatus::Processing);
    assert_eq!(api.status("t1").await.unwrap(), TimelineStatus::Completed);
}

#[actix_rt::test]
async fn test_report_save_and_generate() {
    let mock = MockGlassBackend::start().await;
    mock.add_report("t1", sample_report("t1"));
    let api = api_for(&mock);

    let report = api.report("t1").await.unwrap();
    assert_eq!(report.auto_markdown.as_deref(), Some("# Auto summary"));
    assert_eq!(report.manual_markdown, None);
    assert_eq!(report.highlights.len(), 1);
    assert_eq!(report.editable_markdown(), "# Auto summary");

    let saved = api
        .save_report("t1", "# My day", &report.manual_metadata)
        .await
        .unwrap();
    assert_eq!(saved.manual_markdown.as_deref(), Some("# My day"));
    assert_eq!(saved.editable_markdown(), "# My day");

    let (saved_id, body) = mock.state.lock().unwrap().saved[0].clone();
    assert_eq!(saved_id, "t1");
    assert_eq!(
        body,
        json!({ "manual_markdown": "# My day", "manual_metadata": { "people": ["Sam"] } })
    );

    let generated = api.generate_report("t1").await.unwrap();
    assert_eq!(generated.timeline_id, "t1");
    assert_eq!(generated.status, "processing");
    assert_eq!(mock.state.lock().unwrap().generated, vec!["t1"]);
}

#[actix_rt::test]
async fn test_save_with_empty_metadata() {
    let mock = MockGlassBackend::start().await;
    mock.add_report("t1", sample_report("t1"));

    api_for(&mock)
        .save_report("t1", "", &Map::new())
        .await
        .unwrap();

    let (_, body) = mock.state.lock().unwrap().saved[0].clone();
    assert_eq!(body, json!({ "manual_markdown": "", "manual_metadata": {} }));
}

#[actix_rt::test]
async fn test_system_status() {
    let mock = MockGlassBackend::start().await;
    let status = api_for(&mock).system_status().await.unwrap();

    assert_eq!(status.chromadb.status, "ready");
    assert!(status.ffmpeg.available);
    assert!(status.is_ready());
}
