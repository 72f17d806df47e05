mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use guardian_api::build_app;
use guardian_api::config::ApiConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-guardian-key";

fn test_config() -> ApiConfig {
    ApiConfig {
        api_key: API_KEY.to_string(),
        vision_url: "http://127.0.0.1:9/api".to_string(),
        typing_delay: Duration::ZERO,
        telemetry_interval: None,
        maintenance_interval: None,
        ..ApiConfig::default()
    }
}

async fn app_with(config: ApiConfig) -> Router {
    build_app(&config).await.expect("app should build").router
}

async fn app() -> Router {
    app_with(test_config()).await
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["intents"], 14);
}

#[tokio::test]
async fn chat_requires_api_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "where is my child" }).to_string()))
        .unwrap();

    let response = app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_prefers_emergency_over_location() {
    let response = app()
        .await
        .oneshot(post_json(
            "/v1/chat",
            json!({ "text": "URGENT, where is the bus?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = read_json(response).await;
    assert_eq!(parsed["intent"], "emergency");
    assert!(parsed["session_id"].as_str().is_some());
    assert_eq!(parsed["messages"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["messages"][1]["sender"], "user");
}

#[tokio::test]
async fn chat_history_follows_the_session() {
    let app = app().await;

    let first = read_json(
        app.clone()
            .oneshot(post_json("/v1/chat", json!({ "text": "hi" })))
            .await
            .unwrap(),
    )
    .await;
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/chat",
            json!({ "session_id": session_id, "text": "when will the bus reach school" }),
        ))
        .await
        .unwrap();
    let second = read_json(response).await;
    assert_eq!(second["intent"], "eta");
    assert!(second["reply_text"].as_str().unwrap().contains("8:20 AM"));

    let history = app
        .clone()
        .oneshot(get(&format!("/v1/chat/{session_id}")))
        .await
        .unwrap();
    assert_eq!(history.status(), StatusCode::OK);
    let history = read_json(history).await;
    assert_eq!(history["messages"].as_array().unwrap().len(), 5);
    assert_eq!(history["typing"], "idle");

    let missing = app.oneshot(get("/v1/chat/nope")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_chat_is_rejected() {
    let response = app()
        .await
        .oneshot(post_json("/v1/chat", json!({ "text": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "empty_message");
}

#[tokio::test]
async fn quick_access_answers_known_intents_only() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json("/v1/chat/quick", json!({ "intent": "driver_info" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert!(parsed["reply_text"].as_str().unwrap().contains("Rajesh Patel"));

    let response = app
        .oneshot(post_json(
            "/v1/chat/quick",
            json!({ "intent": "not_a_real_intent" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "unknown_intent");
}

#[tokio::test]
async fn intents_list_emergency_first() {
    let response = app().await.oneshot(get("/v1/intents")).await.unwrap();
    let parsed = read_json(response).await;

    assert_eq!(parsed["evaluation_order"][0]["name"], "emergency");
    assert_eq!(parsed["evaluation_order"][13]["name"], "fallback");
    assert_eq!(parsed["quick_access"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn attendance_summary_and_marking() {
    let app = app().await;

    let summary = read_json(
        app.clone()
            .oneshot(get("/v1/attendance/summary"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(summary["summary"]["total"], 4);
    assert_eq!(summary["summary"]["present_percentage"], 75.0);

    let absent_day = summary["days"][2]["date"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/attendance/mark",
            json!({ "date": absent_day, "status": "present", "time": "8:02 AM" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["present"], 4);

    let response = app
        .oneshot(post_json(
            "/v1/attendance/record_time",
            json!({ "date": "1999-01-01", "slot": "morning-exit" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vision_failures_map_to_bad_gateway() {
    let response = app()
        .await
        .oneshot(get("/v1/vision/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(read_json(response).await["error"], "vision_unavailable");
}

#[tokio::test]
async fn vision_calls_are_proxied() {
    let stub_url = common::spawn_stub(common::face_recognition_stub()).await;
    let app = app_with(ApiConfig {
        vision_url: stub_url,
        ..test_config()
    })
    .await;

    let status = app
        .clone()
        .oneshot(get("/v1/vision/status"))
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(read_json(status).await["system_ready"], true);

    let started = app
        .clone()
        .oneshot(post_json("/v1/vision/start", json!({ "camera_type": "entry" })))
        .await
        .unwrap();
    assert_eq!(read_json(started).await["message"], "started entry camera");

    let invalid = app
        .clone()
        .oneshot(post_json("/v1/vision/start", json!({ "camera_type": "roof" })))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let stopped = app
        .oneshot(post_json("/v1/vision/stop", json!({})))
        .await
        .unwrap();
    assert_eq!(stopped.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(read_json(stopped).await["upstream_status"], 400);
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let app = app_with(ApiConfig {
        rate_limit_max: 2,
        ..test_config()
    })
    .await;

    for _ in 0..2 {
        let response = app.clone().oneshot(get("/v1/snapshot")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(get("/v1/snapshot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_reset_the_limit() {
    let app = app_with(ApiConfig {
        rate_limit_max: 2,
        ..test_config()
    })
    .await;

    let mut statuses = Vec::new();
    for hop in 0..5 {
        let mut request = get("/v1/snapshot");
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("203.0.113.{hop}").parse().unwrap(),
        );
        let response = app
            .clone()
            .oneshot(from_peer(request, "198.51.100.7:40000"))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[..2], [StatusCode::OK, StatusCode::OK]);
    assert!(statuses[2..]
        .iter()
        .all(|status| *status == StatusCode::TOO_MANY_REQUESTS));

    let other_peer = app
        .oneshot(from_peer(get("/v1/snapshot"), "198.51.100.8:40000"))
        .await
        .unwrap();
    assert_eq!(other_peer.status(), StatusCode::OK);
}

#[tokio::test]
async fn trusted_proxy_limits_each_forwarded_client() {
    let app = app_with(ApiConfig {
        rate_limit_max: 1,
        trusted_proxies: vec!["10.0.0.2".parse().unwrap()],
        ..test_config()
    })
    .await;

    for client in ["203.0.113.1", "203.0.113.2"] {
        let mut request = get("/v1/snapshot");
        request
            .headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        let response = app
            .clone()
            .oneshot(from_peer(request, "10.0.0.2:443"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let mut repeat = get("/v1/snapshot");
    repeat
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
    let response = app
        .oneshot(from_peer(repeat, "10.0.0.2:443"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn maintenance_purges_expired_sessions() {
    let app = build_app(&ApiConfig {
        session_ttl: Duration::ZERO,
        maintenance_interval: Some(Duration::from_millis(10)),
        ..test_config()
    })
    .await
    .unwrap();
    let router = app.router.clone();

    let reply = read_json(
        router
            .clone()
            .oneshot(post_json("/v1/chat", json!({ "text": "hi" })))
            .await
            .unwrap(),
    )
    .await;
    let session_id = reply["session_id"].as_str().unwrap().to_string();

    let mut purged = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let response = router
            .clone()
            .oneshot(get(&format!("/v1/chat/{session_id}")))
            .await
            .unwrap();
        if response.status() == StatusCode::NOT_FOUND {
            purged = true;
            break;
        }
    }
    app.abort_background_tasks();
    assert!(purged);
}
