pub mod attendance;
pub mod engine;
pub mod error;
pub mod intent;
pub mod models;
pub mod responder;
pub mod telemetry;

pub use attendance::{AttendanceDay, AttendanceLedger, AttendanceStatus, AttendanceSummary, TimeSlot};
pub use engine::{IntentEngine, IntentSummary, MatchTrace};
pub use error::{CatalogError, EngineError};
pub use intent::{builtin_catalog, normalize_utterance, IntentSpec};
pub use models::*;
pub use responder::{Responder, ResponderRegistry, WELCOME_TEXT};
pub use telemetry::{SimulatedTelemetry, SnapshotProvider, StaticSnapshot};
