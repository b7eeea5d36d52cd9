//! Fixed-window admission guard
//!
//! Gates the shorten endpoint independently of the store: each caller
//! key gets a 60-second window of at most 10 requests. Windows reset
//! lazily on the next request after expiry, not on a background timer;
//! a periodic [`AdmissionGuard::sweep`] removes idle windows so memory
//! stays bounded to active callers.
//!
//! Once a window hits its limit the counter freezes; over-limit
//! requests are rejected without growing the count further.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

pub const RATE_WINDOW: Duration = Duration::from_secs(60);
pub const MAX_REQUESTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected { retry_after_secs: u64 },
}

struct RateWindow {
    count: u32,
    reset_at: Instant,
}

pub struct AdmissionGuard {
    windows: DashMap<String, RateWindow>,
    window: Duration,
    max_requests: u32,
}

impl AdmissionGuard {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        AdmissionGuard {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Admits or rejects one request for a caller key. A rejection
    /// carries the seconds remaining until the key's window resets.
    pub fn check(&self, caller_key: &str) -> Admission {
        let now = Instant::now();
        let mut record = self
            .windows
            .entry(caller_key.to_string())
            .or_insert_with(|| RateWindow {
                count: 0,
                reset_at: now + self.window,
            });

        if now > record.reset_at {
            record.count = 0;
            record.reset_at = now + self.window;
        }

        if record.count >= self.max_requests {
            let remaining = record.reset_at.saturating_duration_since(now);
            return Admission::Rejected {
                retry_after_secs: remaining.as_secs_f64().ceil() as u64,
            };
        }

        record.count += 1;
        Admission::Allowed
    }

    /// Removes windows whose reset time has passed with no further
    /// requests. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, record| now <= record.reset_at);
        let removed = before - self.windows.len();

        if removed > 0 {
            debug!("Cleaned up {} rate limit records", removed);
        }
        removed
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
