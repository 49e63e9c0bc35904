use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::{RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_MS};

/// Decides whether a client may make another request right now.
///
/// Implementations record the request when they allow it.
pub trait RateLimiter: Send + Sync {
    fn check_and_record(&self, client_id: &str, now_ms: u64) -> bool;
}

/// In-process sliding window: at most `max_requests` accepted per client in
/// any trailing `window_ms`. Clients idle for a whole window are dropped on
/// the next sweep, at most once per window.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window_ms: u64,
    requests: Mutex<Windows>,
}

#[derive(Default)]
struct Windows {
    clients: HashMap<String, Vec<u64>>,
    last_sweep_ms: u64,
}

impl Windows {
    fn sweep(&mut self, now_ms: u64, window_ms: u64) {
        if now_ms.saturating_sub(self.last_sweep_ms) < window_ms {
            return;
        }
        self.clients
            .retain(|_, recent| recent.iter().any(|&t| now_ms.saturating_sub(t) < window_ms));
        self.last_sweep_ms = now_ms;
    }
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
            requests: Mutex::new(Windows::default()),
        }
    }

    /// Number of clients with a recorded timestamp
    pub fn tracked_clients(&self) -> usize {
        self.requests.lock().map(|r| r.clients.len()).unwrap_or(0)
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_MS)
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check_and_record(&self, client_id: &str, now_ms: u64) -> bool {
        // A poisoned lock only means another request panicked mid-update;
        // the timestamps are still usable.
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window_ms = self.window_ms;
        requests.sweep(now_ms, window_ms);

        let recent = requests.clients.entry(client_id.to_string()).or_default();
        recent.retain(|&t| now_ms.saturating_sub(t) < window_ms);

        if recent.len() >= self.max_requests {
            return false;
        }

        recent.push(now_ms);
        true
    }
}
