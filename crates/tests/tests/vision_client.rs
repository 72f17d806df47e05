mod common;

use guardian_vision::{CameraKind, CameraSelection, VisionClient, VisionError};

async fn client() -> VisionClient {
    let base_url = common::spawn_stub(common::face_recognition_stub()).await;
    VisionClient::new(&base_url).expect("client should build")
}

#[tokio::test]
async fn reads_status_and_attendance() {
    let client = client().await;

    let status = client.status().await.unwrap();
    assert!(status.system_ready);
    assert_eq!(status.known_faces, vec!["Divyesh", "Karan"]);

    let records = client.attendance().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].camera, CameraKind::Exit);
}

#[tokio::test]
async fn start_sends_camera_type() {
    let client = client().await;
    let ack = client.start(CameraSelection::Both).await.unwrap();
    assert!(ack.success);
    assert_eq!(ack.message, "started both camera");
}

#[tokio::test]
async fn error_body_is_surfaced() {
    let client = client().await;
    match client.stop().await {
        Err(VisionError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "System is not running");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_error_body_uses_default_message() {
    let client = client().await;
    match client.encode().await {
        Err(VisionError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to encode faces");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_reads_report_the_status_reason() {
    let base_url = common::spawn_stub(common::offline_stub()).await;
    let client = VisionClient::new(&base_url).unwrap();

    match client.status().await {
        Err(VisionError::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "Failed to get system status: Service Unavailable");
        }
        other => panic!("expected api error, got {other:?}"),
    }
    match client.attendance().await {
        Err(VisionError::Api { message, .. }) => {
            assert_eq!(message, "Failed to get attendance data: Service Unavailable");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let client = VisionClient::new("http://127.0.0.1:9/api").unwrap();
    assert!(matches!(
        client.status().await,
        Err(VisionError::Transport(_))
    ));
}
