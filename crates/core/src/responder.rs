use std::collections::HashMap;

use crate::intent::{
    BUS_CONDITION, BUS_NUMBER, BUS_STARTED, BUS_STOP, DRIVER_INFO, EMERGENCY, ETA, FALLBACK,
    GREETING, LOCATION, ROUTE, SAFETY_CONCERN, SPEED, THANKS,
};
use crate::models::StateSnapshot;

pub type Responder = fn(&StateSnapshot) -> String;

pub const WELCOME_TEXT: &str = "Hello! I'm GuardianBot, your assistant for real-time bus journey updates. How can I help you today?";
pub const GREETING_TEXT: &str = "Hello! I'm GuardianBot, here to help you with information about your child's school bus journey. How can I assist you today?";
pub const THANKS_TEXT: &str = "You're welcome! I'm here to help. Feel free to ask if you need any more information about the school bus journey.";
pub const SAFETY_TEXT: &str = "Yes, everything is going well. The bus is operating normally and following the designated route. Your child is safe.";
pub const EMERGENCY_TEXT: &str = "I've notified the school staff about your concern. Please stay connected — someone will contact you shortly.";
pub const FALLBACK_TEXT: &str = "I'm not sure I understand that query. You can ask about your child's location, bus details, driver information, or use the quick access buttons below.";

/// Reply generators keyed by intent name, kept apart from the pattern table
/// so pattern coverage can be tested without touching reply copy.
#[derive(Debug, Clone, Default)]
pub struct ResponderRegistry {
    by_name: HashMap<String, Responder>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(LOCATION, location)
            .register(ETA, eta)
            .register(BUS_STARTED, bus_started)
            .register(BUS_STOP, bus_stop)
            .register(DRIVER_INFO, driver_info)
            .register(BUS_NUMBER, bus_number)
            .register(BUS_CONDITION, bus_condition)
            .register(SAFETY_CONCERN, |_| SAFETY_TEXT.to_string())
            .register(EMERGENCY, |_| EMERGENCY_TEXT.to_string())
            .register(SPEED, speed)
            .register(ROUTE, route)
            .register(GREETING, |_| GREETING_TEXT.to_string())
            .register(THANKS, |_| THANKS_TEXT.to_string())
            .register(FALLBACK, |_| FALLBACK_TEXT.to_string());
        registry
    }

    pub fn register(&mut self, name: &str, responder: Responder) -> &mut Self {
        self.by_name.insert(name.to_string(), responder);
        self
    }

    pub fn get(&self, name: &str) -> Option<Responder> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

fn location(state: &StateSnapshot) -> String {
    format!(
        "Your child, {}, boarded the bus at {}. The bus is currently near {}. ETA to school: {}.",
        state.student.name,
        state.student.boarding_time,
        state.student.current_location,
        state.student.eta_to_school
    )
}

fn eta(state: &StateSnapshot) -> String {
    format!(
        "The bus is expected to reach school at {} and back home at {}.",
        state.student.eta_to_school, state.student.eta_to_home
    )
}

fn bus_started(state: &StateSnapshot) -> String {
    if state.student.bus_started {
        format!(
            "Yes, the bus journey has started at {} and is currently at {}.",
            state.student.boarding_time, state.student.current_location
        )
    } else {
        "The bus hasn't started its journey yet. It's scheduled to start soon.".to_string()
    }
}

fn bus_stop(state: &StateSnapshot) -> String {
    format!(
        "The bus is currently at {}. The next stop will be {}.",
        state.student.current_stop, state.student.next_stop
    )
}

fn driver_info(state: &StateSnapshot) -> String {
    format!(
        "Today's driver is {}, with {} of experience. Driver rating: {}.",
        state.driver.name,
        state.driver.experience_label(),
        state.driver.rating_label()
    )
}

fn bus_number(state: &StateSnapshot) -> String {
    format!(
        "The bus number is {}. It's a {} with a capacity of {}.",
        state.bus.number,
        state.bus.model,
        state.bus.capacity_label()
    )
}

fn bus_condition(state: &StateSnapshot) -> String {
    format!(
        "The bus condition is {}. The last maintenance check was {}.",
        state.bus.condition,
        state.bus.last_maintenance_label()
    )
}

fn speed(state: &StateSnapshot) -> String {
    format!(
        "The current speed of the bus is {}, which is within the safety limits for school buses.",
        state.bus.speed_label()
    )
}

fn route(state: &StateSnapshot) -> String {
    if state.bus.on_route {
        "Yes, the bus is following the designated route as expected.".to_string()
    } else {
        "The bus has a slight deviation from the usual route, likely due to traffic or road work. It's being monitored.".to_string()
    }
}
