use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter per client address. Clients with no hit
/// inside the window are dropped by `sweep`.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    hits: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, client: IpAddr) -> bool {
        self.allow_at(client, Instant::now())
    }

    /// Removes clients whose window has fully elapsed and returns how many
    /// were released.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.lock().len()
    }

    fn allow_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut hits = self.hits.lock();
        let recent = hits.entry(client).or_default();
        expire(recent, now, self.window);

        if recent.len() < self.max_requests {
            recent.push_back(now);
            return true;
        }
        if recent.is_empty() {
            hits.remove(&client);
        }
        false
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut hits = self.hits.lock();
        let before = hits.len();
        hits.retain(|_, recent| {
            expire(recent, now, self.window);
            !recent.is_empty()
        });
        before - hits.len()
    }
}

fn expire(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while recent
        .front()
        .is_some_and(|at| now.duration_since(*at) >= window)
    {
        recent.pop_front();
    }
}
