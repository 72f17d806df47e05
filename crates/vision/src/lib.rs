//! Client for the face-recognition attendance service that watches the bus
//! entry and exit cameras.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("face recognition service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("face recognition service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSelection {
    Entry,
    Exit,
    Both,
}

impl CameraSelection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "entry" => Some(Self::Entry),
            "exit" => Some(Self::Exit),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub system_ready: bool,
    pub is_processing: bool,
    #[serde(default)]
    pub known_faces: Vec<String>,
    #[serde(default)]
    pub entry_marked: Vec<String>,
    #[serde(default)]
    pub exit_marked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub name: String,
    pub date: String,
    pub time: String,
    pub camera: CameraKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeAck {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub encoded_faces: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StartRequest {
    camera_type: CameraSelection,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VisionClient {
    client: Client,
    base_url: String,
}

impl VisionClient {
    pub fn new(base_url: &str) -> VisionResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads `GUARDIAN_VISION_URL`, falling back to the local default.
    pub fn from_env() -> VisionResult<Self> {
        let base_url =
            std::env::var("GUARDIAN_VISION_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> VisionResult<SystemStatus> {
        self.send(
            self.client.get(self.url("status")),
            Failure::WithReason("Failed to get system status"),
        )
        .await
    }

    pub async fn attendance(&self) -> VisionResult<Vec<AttendanceRecord>> {
        self.send(
            self.client.get(self.url("attendance")),
            Failure::WithReason("Failed to get attendance data"),
        )
        .await
    }

    pub async fn start(&self, camera_type: CameraSelection) -> VisionResult<CommandAck> {
        self.send(
            self.client
                .post(self.url("start"))
                .json(&StartRequest { camera_type }),
            Failure::BodyOr("Failed to start face recognition"),
        )
        .await
    }

    pub async fn stop(&self) -> VisionResult<CommandAck> {
        self.send(
            self.client.post(self.url("stop")),
            Failure::BodyOr("Failed to stop face recognition"),
        )
        .await
    }

    pub async fn encode(&self) -> VisionResult<EncodeAck> {
        self.send(
            self.client.post(self.url("encode")),
            Failure::BodyOr("Failed to encode faces"),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        failure: Failure,
    ) -> VisionResult<T> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "vision response");

        if !status.is_success() {
            let message = failure.message(status, response).await;
            warn!(status = status.as_u16(), message = %message, "vision call failed");
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| VisionError::Decode(err.to_string()))
    }
}

/// How a non-2xx reply is turned into an error message.
#[derive(Debug, Clone, Copy)]
enum Failure {
    /// Reads: the fixed message plus the HTTP reason phrase. The body is ignored.
    WithReason(&'static str),
    /// Commands: the body's `error` field, else the bare default.
    BodyOr(&'static str),
}

impl Failure {
    async fn message(self, status: StatusCode, response: Response) -> String {
        match self {
            Self::WithReason(prefix) => match status.canonical_reason() {
                Some(reason) => format!("{prefix}: {reason}"),
                None => prefix.to_string(),
            },
            Self::BodyOr(default) => response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| default.to_string()),
        }
    }
}
