pub mod config;
pub mod rate_limit;

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, Json, Path as AxumPath, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use chrono::{Datelike, NaiveDate, Utc};
use guardian_agents::{AgentConfig, AgentError, ChatAgent};
use guardian_core::{
    AttendanceLedger, AttendanceStatus, ChatInput, EngineError, IntentEngine, QuickAccessInput,
    ResponderRegistry, SimulatedTelemetry, StateSnapshot, TimeSlot, QUICK_ACCESS,
};
use guardian_observability::AppMetrics;
use guardian_storage::MemoryStore;
use guardian_vision::{CameraSelection, VisionClient, VisionError};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::rate_limit::IpRateLimiter;

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ChatAgent<MemoryStore>>,
    pub metrics: Arc<AppMetrics>,
    pub vision: VisionClient,
    pub attendance: Arc<RwLock<AttendanceLedger>>,
    pub api_key: String,
    pub limiter: IpRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub trusted_proxies: Arc<Vec<IpAddr>>,
}

/// Router plus the background tasks, which the caller aborts on shutdown.
pub struct GuardianApp {
    pub router: Router,
    pub telemetry_task: Option<JoinHandle<()>>,
    pub maintenance_task: Option<JoinHandle<()>>,
}

impl GuardianApp {
    pub fn abort_background_tasks(&self) {
        for task in [&self.telemetry_task, &self.maintenance_task]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    intents: usize,
    metrics: guardian_observability::MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct IntentsResponse {
    evaluation_order: Vec<guardian_core::IntentSummary>,
    quick_access: &'static [guardian_core::QuickAccessButton],
}

#[derive(Debug, Deserialize)]
struct MarkAttendanceRequest {
    date: NaiveDate,
    status: AttendanceStatus,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordTimeRequest {
    date: NaiveDate,
    slot: String,
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartCamerasRequest {
    camera_type: String,
}

pub async fn build_app(config: &ApiConfig) -> Result<GuardianApp> {
    let metrics = AppMetrics::shared();

    let snapshot = match config.snapshot_file.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading snapshot fixture {}", path.display()))?;
            StateSnapshot::from_json(&raw)
                .with_context(|| format!("invalid snapshot fixture {}", path.display()))?
        }
        None => StateSnapshot::demo(),
    };

    let engine = match config.catalog_file.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading intent catalog {}", path.display()))?;
            IntentEngine::from_json(&raw, &ResponderRegistry::builtin())
                .with_context(|| format!("invalid intent catalog {}", path.display()))?
        }
        None => IntentEngine::builtin(),
    };

    let telemetry = Arc::new(SimulatedTelemetry::new(snapshot));
    let telemetry_task = config
        .telemetry_interval
        .map(|every| spawn_telemetry(telemetry.clone(), every));

    let agent = Arc::new(ChatAgent::new(
        Arc::new(engine),
        telemetry,
        Arc::new(MemoryStore::new()),
        metrics.clone(),
        AgentConfig {
            typing_delay: config.typing_delay,
            ..AgentConfig::default()
        },
    ));

    let vision = VisionClient::new(&config.vision_url)
        .context("failed to build face recognition client")?;

    let today = Utc::now().date_naive();
    let state = ApiState {
        agent,
        metrics,
        vision,
        attendance: Arc::new(RwLock::new(AttendanceLedger::demo(
            today.year(),
            today.month(),
        ))),
        api_key: config.api_key.clone(),
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        allowed_origins: Arc::new(config.allowed_origins.clone()),
        trusted_proxies: Arc::new(config.trusted_proxies.clone()),
    };

    let maintenance_task = config
        .maintenance_interval
        .map(|every| spawn_maintenance(state.clone(), every, config.session_ttl));

    Ok(GuardianApp {
        router: build_router(state),
        telemetry_task,
        maintenance_task,
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/chat/quick", post(chat_quick))
        .route("/v1/chat/:session_id", get(chat_history))
        .route("/v1/intents", get(intents))
        .route("/v1/snapshot", get(snapshot))
        .route("/v1/attendance/summary", get(attendance_summary))
        .route("/v1/attendance/mark", post(attendance_mark))
        .route("/v1/attendance/record_time", post(attendance_record_time))
        .route("/v1/vision/status", get(vision_status))
        .route("/v1/vision/attendance", get(vision_attendance))
        .route("/v1/vision/start", post(vision_start))
        .route("/v1/vision/stop", post(vision_stop))
        .route("/v1/vision/encode", post(vision_encode))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

/// Jitters the simulated bus feed on a fixed cadence until aborted.
pub fn spawn_telemetry(telemetry: Arc<SimulatedTelemetry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let snapshot = telemetry.tick(&mut rng);
            debug!(
                speed_kmh = snapshot.bus.speed_kmh,
                eta_minutes = ?snapshot.eta_minutes,
                "telemetry tick"
            );
        }
    })
}

/// Periodically drops expired chat sessions and idle rate-limit entries.
pub fn spawn_maintenance(state: ApiState, every: Duration, session_ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            run_maintenance(&state, session_ttl).await;
        }
    })
}

pub async fn run_maintenance(state: &ApiState, session_ttl: Duration) {
    match chrono::Duration::from_std(session_ttl) {
        Ok(max_age) => match state.agent.purge_sessions_older_than(max_age).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "expired chat sessions purged"),
            Err(error) => warn!(error = %error, "session purge failed"),
        },
        Err(error) => warn!(error = %error, "session ttl out of range, purge skipped"),
    }

    let released = state.limiter.sweep();
    if released > 0 {
        debug!(released, "idle rate limit entries released");
    }
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: Utc::now().to_rfc3339(),
        intents: state.agent.engine().intents().len(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn chat(State(state): State<ApiState>, Json(input): Json<ChatInput>) -> Response {
    match state.agent.handle_chat(input).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(error) => agent_error_response(error),
    }
}

async fn chat_quick(
    State(state): State<ApiState>,
    Json(input): Json<QuickAccessInput>,
) -> Response {
    match state.agent.quick_access(input).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(error) => agent_error_response(error),
    }
}

async fn chat_history(
    State(state): State<ApiState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    match state.agent.history(&session_id).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(error) => agent_error_response(error),
    }
}

async fn intents(State(state): State<ApiState>) -> impl IntoResponse {
    Json(IntentsResponse {
        evaluation_order: state.agent.engine().intents(),
        quick_access: QUICK_ACCESS,
    })
}

async fn snapshot(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.agent.snapshot())
}

async fn attendance_summary(State(state): State<ApiState>) -> impl IntoResponse {
    let ledger = state.attendance.read();
    Json(serde_json::json!({
        "student": ledger.student,
        "summary": ledger.summary(),
        "days": ledger.days,
    }))
}

async fn attendance_mark(
    State(state): State<ApiState>,
    Json(request): Json<MarkAttendanceRequest>,
) -> impl IntoResponse {
    let time = request.time.unwrap_or_else(clock_time);
    let mut ledger = state.attendance.write();
    ledger.mark(request.date, request.status, &time);
    (StatusCode::OK, Json(ledger.summary()))
}

async fn attendance_record_time(
    State(state): State<ApiState>,
    Json(request): Json<RecordTimeRequest>,
) -> Response {
    let Some(slot) = TimeSlot::parse(&request.slot) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_slot",
            "slot must be morning-entry, morning-exit, afternoon-entry or afternoon-exit",
        );
    };

    let time = request.time.unwrap_or_else(clock_time);
    let mut ledger = state.attendance.write();
    if !ledger.record_time(request.date, slot, &time) {
        return error_response(
            StatusCode::NOT_FOUND,
            "attendance_day_not_found",
            "mark attendance for this date before recording times",
        );
    }

    match ledger.day(request.date) {
        Some(day) => (StatusCode::OK, Json(day.clone())).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn vision_status(State(state): State<ApiState>) -> Response {
    vision_response(&state, state.vision.status().await)
}

async fn vision_attendance(State(state): State<ApiState>) -> Response {
    vision_response(&state, state.vision.attendance().await)
}

async fn vision_start(
    State(state): State<ApiState>,
    Json(request): Json<StartCamerasRequest>,
) -> Response {
    let Some(camera_type) = CameraSelection::parse(&request.camera_type) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_camera_type",
            "camera_type must be entry, exit or both",
        );
    };
    vision_response(&state, state.vision.start(camera_type).await)
}

async fn vision_stop(State(state): State<ApiState>) -> Response {
    vision_response(&state, state.vision.stop().await)
}

async fn vision_encode(State(state): State<ApiState>) -> Response {
    vision_response(&state, state.vision.encode().await)
}

fn vision_response<T: Serialize>(state: &ApiState, result: Result<T, VisionError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => {
            state.metrics.inc_vision_error();
            warn!(error = %error, "face recognition call failed");
            let status = match &error {
                VisionError::Api { status, .. } => Some(*status),
                _ => None,
            };
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "vision_unavailable",
                    "message": error.to_string(),
                    "upstream_status": status,
                })),
            )
                .into_response()
        }
    }
}

fn agent_error_response(error: AgentError) -> Response {
    match error {
        AgentError::EmptyMessage => error_response(
            StatusCode::BAD_REQUEST,
            "empty_message",
            "message text must not be blank",
        ),
        AgentError::UnknownSession(id) => error_response(
            StatusCode::NOT_FOUND,
            "unknown_session",
            &format!("session {} not found", id),
        ),
        AgentError::Engine(EngineError::UnknownIntent(name)) => error_response(
            StatusCode::NOT_FOUND,
            "unknown_intent",
            &format!("intent {} is not in the catalog", name),
        ),
        AgentError::Storage(error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "chat_failed",
            &error.to_string(),
        ),
    }
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-api-key")])
}

fn clock_time() -> String {
    Utc::now().format("%-I:%M %p").to_string()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_ip(&request, &state.trusted_proxies);
    if !state.limiter.allow(client) {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this IP",
        );
    }

    next.run(request).await
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

/// Client address for rate limiting: the socket peer, or the nearest
/// untrusted `x-forwarded-for` hop when the peer is a trusted proxy.
/// Requests without connection info share one bucket.
fn client_ip(request: &Request<Body>, trusted_proxies: &[IpAddr]) -> IpAddr {
    let Some(peer) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    };

    if !trusted_proxies.contains(&peer) {
        return peer;
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .rsplit(',')
                .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                .find(|hop| !trusted_proxies.contains(hop))
        })
        .unwrap_or(peer)
}
