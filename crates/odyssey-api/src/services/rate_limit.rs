//! Fixed-window rate limit counters.
//!
//! Counters are keyed by `(bucket, client key)`. A bucket names one limiter
//! instance ("read", "mutate") so both policies can share a store without
//! their counts mixing.
//!
//! Windows are measured with `tokio::time::Instant`, so tests can drive
//! expiry with `tokio::time::pause` and `advance`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Entry count above which expired windows are swept on the next hit.
const SWEEP_THRESHOLD: usize = 10_000;

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Requests counted in the current window, including this one.
    pub count: u32,
    /// When the current window ends.
    pub resets_at: Instant,
}

/// Storage for rate limit counters.
///
/// `hit` must increment and read the counter atomically.
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` in `bucket`, opening a new window if the
    /// previous one has ended.
    fn hit(&self, bucket: &str, key: &str, window: Duration, now: Instant) -> WindowHit;

    /// Drop every counter.
    fn reset(&self);
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    resets_at: Instant,
}

/// In-memory `RateLimitStore`. Counters do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<(String, String), WindowEntry>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live counters.
    pub fn len(&self) -> usize {
        self.windows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<(String, String), WindowEntry>> {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn hit(&self, bucket: &str, key: &str, window: Duration, now: Instant) -> WindowHit {
        let mut windows = self.windows();

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, entry| entry.resets_at > now);
        }

        let entry = windows
            .entry((bucket.to_string(), key.to_string()))
            .or_insert(WindowEntry {
                count: 0,
                resets_at: now + window,
            });

        if entry.resets_at <= now {
            entry.count = 0;
            entry.resets_at = now + window;
        }

        entry.count = entry.count.saturating_add(1);

        WindowHit {
            count: entry.count,
            resets_at: entry.resets_at,
        }
    }

    fn reset(&self) {
        self.windows().clear();
    }
}
