use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source, millisecond resolution. Abstracted so the engine
/// and its tests can run against a hand-advanced clock.
pub trait Clock {
    /// Elapsed time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Production clock backed by `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Test clock advanced explicitly. Clones share the same time, so a test can
/// keep one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Passive per-trial stopwatch with a maximum-wait ceiling. The caller's
/// event loop polls `expired`; nothing here blocks or schedules.
#[derive(Debug, Clone, Copy)]
pub struct TrialTimer {
    started_at: Duration,
    timeout: Duration,
}

impl TrialTimer {
    pub fn start(clock: &impl Clock, timeout: Duration) -> Self {
        Self {
            started_at: clock.now(),
            timeout,
        }
    }

    pub fn elapsed(&self, clock: &impl Clock) -> Duration {
        clock.now().saturating_sub(self.started_at)
    }

    pub fn elapsed_ms(&self, clock: &impl Clock) -> u64 {
        self.elapsed(clock).as_millis() as u64
    }

    pub fn expired(&self, clock: &impl Clock) -> bool {
        self.elapsed(clock) >= self.timeout
    }

    /// Time left before the ceiling, zero once expired.
    pub fn remaining_ms(&self, clock: &impl Clock) -> u64 {
        self.timeout
            .saturating_sub(self.elapsed(clock))
            .as_millis() as u64
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
