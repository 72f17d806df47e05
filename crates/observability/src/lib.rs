use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    resolves_total: AtomicU64,
    fallback_total: AtomicU64,
    emergency_total: AtomicU64,
    quick_access_total: AtomicU64,
    unknown_intent_total: AtomicU64,
    vision_errors_total: AtomicU64,
    total_latency_millis: AtomicU64,
    latency_samples: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub resolves_total: u64,
    pub fallback_total: u64,
    pub emergency_total: u64,
    pub quick_access_total: u64,
    pub unknown_intent_total: u64,
    pub vision_errors_total: u64,
    pub latency_samples: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("guardian_requests_total").increment(1);
    }

    /// Counts one free-text resolution, tagged by the winning intent.
    pub fn record_resolve(&self, intent: &str) {
        self.resolves_total.fetch_add(1, Ordering::Relaxed);
        match intent {
            "fallback" => {
                self.fallback_total.fetch_add(1, Ordering::Relaxed);
            }
            "emergency" => {
                self.emergency_total.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        metrics::counter!("guardian_resolves_total", "intent" => intent.to_string()).increment(1);
    }

    pub fn inc_quick_access(&self) {
        self.quick_access_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("guardian_quick_access_total").increment(1);
    }

    pub fn inc_unknown_intent(&self) {
        self.unknown_intent_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("guardian_unknown_intent_total").increment(1);
    }

    pub fn inc_vision_error(&self) {
        self.vision_errors_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("guardian_vision_errors_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
        metrics::histogram!("guardian_reply_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self.total_latency_millis.load(Ordering::Relaxed);
        let samples = self.latency_samples.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            resolves_total: self.resolves_total.load(Ordering::Relaxed),
            fallback_total: self.fallback_total.load(Ordering::Relaxed),
            emergency_total: self.emergency_total.load(Ordering::Relaxed),
            quick_access_total: self.quick_access_total.load(Ordering::Relaxed),
            unknown_intent_total: self.unknown_intent_total.load(Ordering::Relaxed),
            vision_errors_total: self.vision_errors_total.load(Ordering::Relaxed),
            latency_samples: samples,
            avg_latency_millis: if samples == 0 {
                0.0
            } else {
                latency as f64 / samples as f64
            },
        }
    }
}

/// JSON logs on stdout, for the long-running services.
pub fn init_tracing(service_name: &str) {
    install_subscriber(service_name, std::io::stdout);
}

/// JSON logs on stderr, for interactive tools whose stdout is the user's.
pub fn init_tracing_stderr(service_name: &str) {
    install_subscriber(service_name, std::io::stderr);
}

fn install_subscriber<W>(service_name: &str, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    TRACING_INIT.get_or_init(|| {
        // a host application may already own the global subscriber
        let _ = tracing::subscriber::set_global_default(json_subscriber(service_name, writer));
    });
}

fn json_subscriber<W>(service_name: &str, writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info,guardian_api=info,guardian_agents=info,guardian_vision=info",
            service_name
        ))
    });

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_current_span(true)
        .with_span_list(true)
        .finish()
}
