use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentState {
    pub name: String,
    pub boarding_time: String,
    pub current_location: String,
    pub eta_to_school: String,
    pub eta_to_home: String,
    pub current_stop: String,
    pub next_stop: String,
    pub bus_started: bool,
    pub on_board: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverState {
    pub name: String,
    pub experience_years: u8,
    pub contact: String,
    pub rating: f32,
}

impl DriverState {
    pub fn experience_label(&self) -> String {
        match self.experience_years {
            1 => "1 year".to_string(),
            years => format!("{} years", years),
        }
    }

    pub fn rating_label(&self) -> String {
        format!("{}/5", self.rating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusState {
    pub number: String,
    pub model: String,
    pub capacity_seats: u16,
    pub condition: String,
    pub last_maintenance_days: u32,
    pub speed_kmh: u32,
    pub on_route: bool,
}

impl BusState {
    pub fn capacity_label(&self) -> String {
        format!("{} seats", self.capacity_seats)
    }

    pub fn last_maintenance_label(&self) -> String {
        match self.last_maintenance_days {
            0 => "today".to_string(),
            1 => "1 day ago".to_string(),
            days => format!("{} days ago", days),
        }
    }

    pub fn speed_label(&self) -> String {
        format!("{} km/h", self.speed_kmh)
    }
}

/// Read-only bundle of student, driver and bus facts used to fill reply
/// templates. Callers build or refresh one per query; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub student: StudentState,
    pub driver: DriverState,
    pub bus: BusState,
    #[serde(default)]
    pub eta_minutes: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StateSnapshot {
    /// The fixture the parent dashboard ships with.
    pub fn demo() -> Self {
        Self {
            student: StudentState {
                name: "Divyesh".to_string(),
                boarding_time: "7:42 AM".to_string(),
                current_location: "Satellite Road".to_string(),
                eta_to_school: "8:20 AM".to_string(),
                eta_to_home: "3:45 PM".to_string(),
                current_stop: "Stop #3 - Satellite Junction".to_string(),
                next_stop: "Stop #4 - Central Mall".to_string(),
                bus_started: true,
                on_board: true,
            },
            driver: DriverState {
                name: "Rajesh Patel".to_string(),
                experience_years: 8,
                contact: "+91 98765 43210".to_string(),
                rating: 4.8,
            },
            bus: BusState {
                number: "GJ-01-XX-1234".to_string(),
                model: "Tata Starbus Ultra".to_string(),
                capacity_seats: 32,
                condition: "Excellent".to_string(),
                last_maintenance_days: 15,
                speed_kmh: 35,
                on_route: true,
            },
            eta_minutes: None,
            updated_at: None,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Outcome of matching one utterance: the winning intent and its reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub intent: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingState {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub typing: TypingState,
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub session_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAccessInput {
    pub session_id: Option<String>,
    pub intent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub intent: String,
    pub reply_text: String,
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickAccessButton {
    pub label: &'static str,
    pub intent: &'static str,
}

pub const QUICK_ACCESS: &[QuickAccessButton] = &[
    QuickAccessButton {
        label: "Location",
        intent: "location",
    },
    QuickAccessButton {
        label: "ETA",
        intent: "eta",
    },
    QuickAccessButton {
        label: "Driver",
        intent: "driver_info",
    },
    QuickAccessButton {
        label: "Bus Details",
        intent: "bus_number",
    },
    QuickAccessButton {
        label: "Speed",
        intent: "speed",
    },
    QuickAccessButton {
        label: "Route",
        intent: "route",
    },
];
