use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use guardian_vision::DEFAULT_BASE_URL;

/// Runtime settings, read from `GUARDIAN_*` environment variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub api_key: String,
    pub vision_url: String,
    pub typing_delay: Duration,
    pub telemetry_interval: Option<Duration>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub snapshot_file: Option<PathBuf>,
    pub catalog_file: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    /// Peers whose `x-forwarded-for` header is believed. Empty means the
    /// socket address is always the client.
    pub trusted_proxies: Vec<IpAddr>,
    pub session_ttl: Duration,
    pub maintenance_interval: Option<Duration>,
}

const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            api_key: "dev-guardian-key".to_string(),
            vision_url: DEFAULT_BASE_URL.to_string(),
            typing_delay: Duration::from_millis(1000),
            telemetry_interval: Some(Duration::from_secs(10)),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            snapshot_file: None,
            catalog_file: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(ToString::to_string)
                .collect(),
            trusted_proxies: Vec::new(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            maintenance_interval: Some(Duration::from_secs(300)),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let telemetry_seconds = parsed("GUARDIAN_TELEMETRY_INTERVAL_SECONDS").unwrap_or(10_u64);
        let maintenance_seconds =
            parsed("GUARDIAN_MAINTENANCE_INTERVAL_SECONDS").unwrap_or(300_u64);

        Self {
            bind: env::var("GUARDIAN_BIND").unwrap_or(defaults.bind),
            api_key: env::var("GUARDIAN_API_KEY").unwrap_or(defaults.api_key),
            vision_url: env::var("GUARDIAN_VISION_URL").unwrap_or(defaults.vision_url),
            typing_delay: parsed("GUARDIAN_TYPING_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.typing_delay),
            telemetry_interval: (telemetry_seconds > 0)
                .then(|| Duration::from_secs(telemetry_seconds)),
            rate_limit_window: parsed("GUARDIAN_RATE_LIMIT_WINDOW_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: parsed("GUARDIAN_RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),
            snapshot_file: non_empty("GUARDIAN_SNAPSHOT_FILE").map(PathBuf::from),
            catalog_file: non_empty("GUARDIAN_CATALOG_FILE").map(PathBuf::from),
            allowed_origins: non_empty("GUARDIAN_ALLOWED_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|origin| origin.trim().trim_end_matches('/').to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
            trusted_proxies: non_empty("GUARDIAN_TRUSTED_PROXIES")
                .map(|value| {
                    value
                        .split(',')
                        .filter_map(|proxy| proxy.trim().parse::<IpAddr>().ok())
                        .collect()
                })
                .unwrap_or(defaults.trusted_proxies),
            session_ttl: parsed("GUARDIAN_SESSION_TTL_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            maintenance_interval: (maintenance_seconds > 0)
                .then(|| Duration::from_secs(maintenance_seconds)),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
