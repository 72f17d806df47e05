#![allow(dead_code)]

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Serves `router` on an ephemeral local port and returns the `/api` base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub should bind");
    let addr = listener.local_addr().expect("stub should have an address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server failed");
    });
    format!("http://{}/api", addr)
}

/// Face recognition service stand-in: status and attendance succeed, start
/// echoes the camera, stop fails with an error body, encode fails bare.
pub fn face_recognition_stub() -> Router {
    Router::new()
        .route(
            "/api/status",
            get(|| async {
                Json(json!({
                    "system_ready": true,
                    "is_processing": false,
                    "known_faces": ["Divyesh", "Karan"],
                    "entry_marked": ["Divyesh"],
                    "exit_marked": []
                }))
            }),
        )
        .route(
            "/api/attendance",
            get(|| async {
                Json(json!([
                    {"name": "Divyesh", "date": "2024-06-03", "time": "07:43:10", "camera": "entry"},
                    {"name": "Divyesh", "date": "2024-06-03", "time": "15:31:02", "camera": "exit"}
                ]))
            }),
        )
        .route(
            "/api/start",
            post(|Json(body): Json<Value>| async move {
                let camera = body["camera_type"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "success": true,
                    "message": format!("started {camera} camera")
                }))
            }),
        )
        .route(
            "/api/stop",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "System is not running" })),
                )
            }),
        )
        .route(
            "/api/encode",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR.into_response() }),
        )
}

/// Service whose reads fail with 503 and an `error` body that callers ignore.
pub fn offline_stub() -> Router {
    let offline = || async {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "camera offline" })),
        )
    };
    Router::new()
        .route("/api/status", get(offline))
        .route("/api/attendance", get(offline))
}
