use serde::{Deserialize, Serialize};

pub const LOCATION: &str = "location";
pub const ETA: &str = "eta";
pub const BUS_STARTED: &str = "bus_started";
pub const BUS_STOP: &str = "bus_stop";
pub const DRIVER_INFO: &str = "driver_info";
pub const BUS_NUMBER: &str = "bus_number";
pub const BUS_CONDITION: &str = "bus_condition";
pub const SAFETY_CONCERN: &str = "safety_concern";
pub const EMERGENCY: &str = "emergency";
pub const SPEED: &str = "speed";
pub const ROUTE: &str = "route";
pub const GREETING: &str = "greeting";
pub const THANKS: &str = "thanks";
pub const FALLBACK: &str = "fallback";

pub const EMERGENCY_PRIORITY: i32 = 100;

/// One row of the pattern table. Carries no behavior; replies come from the
/// responder registry keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSpec {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl IntentSpec {
    pub fn new(name: &str, priority: i32, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            priority,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// First pattern contained in an already-normalized utterance.
    pub fn first_match(&self, normalized: &str) -> Option<&str> {
        self.patterns
            .iter()
            .map(String::as_str)
            .find(|pattern| normalized.contains(pattern))
    }
}

/// Lowercasing is the only normalization: no trimming, punctuation stripping
/// or tokenization, so matching stays plain substring containment.
pub fn normalize_utterance(input: &str) -> String {
    input.to_lowercase()
}

/// The catalog shipped with the parent dashboard, in declaration order.
/// Narrow intents sit above broad ones; `emergency` is lifted by priority.
pub fn builtin_catalog() -> Vec<IntentSpec> {
    vec![
        IntentSpec::new(
            LOCATION,
            0,
            &[
                "where is my child",
                "where is the bus",
                "bus location",
                "current location",
                "where",
                "student location",
            ],
        ),
        IntentSpec::new(
            ETA,
            0,
            &[
                "eta",
                "how long",
                "time to reach",
                "arrival time",
                "when will",
                "how much time",
            ],
        ),
        IntentSpec::new(
            BUS_STARTED,
            0,
            &[
                "has the bus started",
                "bus started",
                "journey begun",
                "beginning journey",
            ],
        ),
        IntentSpec::new(
            BUS_STOP,
            0,
            &["which stop", "current stop", "bus stop", "next stop"],
        ),
        IntentSpec::new(
            DRIVER_INFO,
            0,
            &[
                "who is the driver",
                "driver today",
                "driving the bus",
                "bus driver",
                "driver details",
                "driver info",
            ],
        ),
        IntentSpec::new(
            BUS_NUMBER,
            0,
            &[
                "bus number",
                "vehicle number",
                "registration number",
                "bus details",
            ],
        ),
        IntentSpec::new(
            BUS_CONDITION,
            0,
            &[
                "bus condition",
                "vehicle condition",
                "how is the bus",
                "maintenance",
                "safety",
            ],
        ),
        IntentSpec::new(
            SAFETY_CONCERN,
            0,
            &[
                "is everything alright",
                "hope safe",
                "safety",
                "concern",
                "worried",
                "alright",
                "okay",
            ],
        ),
        IntentSpec::new(
            EMERGENCY,
            EMERGENCY_PRIORITY,
            &[
                "emergency",
                "urgent",
                "help",
                "need assistance",
                "critical",
                "immediate",
                "urgently",
            ],
        ),
        IntentSpec::new(
            SPEED,
            0,
            &["how fast", "speed", "velocity", "bus speed", "speeding"],
        ),
        IntentSpec::new(
            ROUTE,
            0,
            &[
                "right route",
                "correct path",
                "route",
                "path",
                "way",
                "direction",
            ],
        ),
        IntentSpec::new(GREETING, 0, &["hi", "hello", "hey", "greetings"]),
        IntentSpec::new(
            THANKS,
            0,
            &["thank you", "thanks", "appreciate", "grateful"],
        ),
        IntentSpec::new(FALLBACK, 0, &[]),
    ]
}

pub fn catalog_from_json(json: &str) -> serde_json::Result<Vec<IntentSpec>> {
    serde_json::from_str(json)
}
