use chrono::Utc;
use parking_lot::RwLock;
use rand::Rng;

use crate::models::StateSnapshot;

pub const BASE_SPEED_KMH: i64 = 45;
pub const MAX_SPEED_KMH: i64 = 80;
pub const BASE_ETA_MINUTES: i64 = 8;
pub const MIN_ETA_MINUTES: i64 = 1;
pub const MAX_ETA_MINUTES: i64 = 15;

/// Source of the snapshot handed to the intent engine. Reads are synchronous
/// and hand back an owned value.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self) -> StateSnapshot;
}

#[derive(Debug, Clone)]
pub struct StaticSnapshot {
    snapshot: StateSnapshot,
}

impl StaticSnapshot {
    pub fn new(snapshot: StateSnapshot) -> Self {
        Self { snapshot }
    }
}

impl SnapshotProvider for StaticSnapshot {
    fn snapshot(&self) -> StateSnapshot {
        self.snapshot.clone()
    }
}

/// Simulated GPS feed: each tick jitters the bus speed and minutes-to-arrival
/// around fixed baselines, the way the live dashboard fakes movement.
#[derive(Debug)]
pub struct SimulatedTelemetry {
    current: RwLock<StateSnapshot>,
}

impl SimulatedTelemetry {
    pub fn new(seed: StateSnapshot) -> Self {
        Self {
            current: RwLock::new(seed),
        }
    }

    pub fn tick<R: Rng>(&self, rng: &mut R) -> StateSnapshot {
        let speed_variation: i64 = rng.gen_range(-5..5);
        let eta_variation: i64 = rng.gen_range(-1..=1);

        let mut guard = self.current.write();
        guard.bus.speed_kmh = (BASE_SPEED_KMH + speed_variation).clamp(0, MAX_SPEED_KMH) as u32;
        guard.eta_minutes =
            Some((BASE_ETA_MINUTES + eta_variation).clamp(MIN_ETA_MINUTES, MAX_ETA_MINUTES) as u32);
        guard.updated_at = Some(Utc::now());
        guard.clone()
    }
}

impl SnapshotProvider for SimulatedTelemetry {
    fn snapshot(&self) -> StateSnapshot {
        self.current.read().clone()
    }
}
