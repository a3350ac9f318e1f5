//! E2E tests: error envelopes and transport failures.

use glass_timeline_lib::api::{GlassApi, HttpGlassApi};
use glass_timeline_lib::config::Config;
use glass_timeline_lib::error::ClientError;
use glass_timeline_lib::models::UploadFile;

use super::mock_backend::{BROKEN_REPORT_ID, MockGlassBackend, OVERSIZED_FILENAME};
use super::test_helpers::*;

#[actix_rt::test]
async fn test_backend_message_is_surfaced() {
    let mock = MockGlassBackend::start().await;
    let file = UploadFile::new(OVERSIZED_FILENAME, vec![0; 16]);

    let err = api_for(&mock).upload(&file).await.unwrap_err();

    match err {
        ClientError::Api { status, ref message } => {
            assert_eq!(status, 413);
            assert_eq!(message, "File exceeds the 500MB limit");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    assert_eq!(err.user_message("Upload failed"), "File exceeds the 500MB limit");
}

#[actix_rt::test]
async fn test_unknown_timeline_status_is_not_found() {
    let mock = MockGlassBackend::start().await;
    let err = api_for(&mock).status("missing").await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "Timeline not found");
}

#[actix_rt::test]
async fn test_empty_error_body_falls_back_to_reason_phrase() {
    let mock = MockGlassBackend::start().await;
    let err = api_for(&mock).report(BROKEN_REPORT_ID).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 500, .. }));
    assert_eq!(err.to_string(), "Internal Server Error");
}

#[actix_rt::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let api = HttpGlassApi::new(&Config::for_backend(format!("http://127.0.0.1:{}", port)))
        .unwrap();

    let err = api.upload_limits().await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {:?}", err);
}
