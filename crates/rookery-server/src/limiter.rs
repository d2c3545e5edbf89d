//! Fixed-window rate limiter.
//!
//! Time is partitioned into non-overlapping windows of length `W`; each key
//! carries a counter and its window's start. O(1) memory per key and O(1)
//! per check, trading strict burst smoothing for simplicity — coarse abuse
//! protection, not precise quota billing.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-key window state. Created lazily on the first request from a key.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Fixed-window admission counter keyed by client identity.
///
/// A limit of 0 means "disabled": every check admits. The limiter itself
/// never fails.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<String, RateWindow>,
}

impl FixedWindowLimiter {
    /// Creates a limiter admitting `limit` requests per key per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: DashMap::new(),
        }
    }

    /// Creates a limiter that admits everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0, Duration::from_secs(1))
    }

    /// Checks whether a request from `key` may proceed.
    ///
    /// Returns `(admitted, retry_after)`; `retry_after` is zero when
    /// admitted, otherwise the time left in the key's current window.
    pub fn allow(&self, key: &str) -> (bool, Duration) {
        if self.limit == 0 {
            return (true, Duration::ZERO);
        }

        let now = Instant::now();
        // The entry guard holds the key's shard exclusively, so the
        // read-increment-compare-write sequence below is serialized per
        // key: admission decisions are linearizable.
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(RateWindow {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        if entry.count > self.limit {
            let retry_after = self.window - now.duration_since(entry.window_start);
            (false, retry_after)
        } else {
            (true, Duration::ZERO)
        }
    }

    /// Removes windows whose last activity started more than `idle_for`
    /// ago, bounding per-key state growth. Returns the number of keys
    /// removed.
    pub fn sweep_idle(&self, idle_for: Duration) -> usize {
        let before = self.windows.len();
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.window_start) < idle_for);
        before - self.windows.len()
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
