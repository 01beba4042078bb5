//! Clock abstraction.
//!
//! The engine deals with two timestamp kinds that must never be mixed: a
//! monotonic microsecond clock used for latency measurement (heartbeat RTT,
//! queue dwell time), and a wall-clock millisecond reading used for FIX
//! tags `52`/`60` and venue-supplied timestamps. Both are obtained through
//! this trait so tests can drive them deterministically instead of reading
//! the real OS clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonically increasing microseconds, unrelated to wall-clock time.
    /// Only valid for measuring durations within a single process run.
    fn monotonic_micros(&self) -> u64;

    /// Wall-clock milliseconds since the Unix epoch.
    fn wall_millis(&self) -> u64;
}

/// Real clock backed by [`std::time::Instant`]/[`SystemTime`].
pub struct SystemClock {
    start: std::time::Instant,
    start_wall_ms: u64,
}

impl SystemClock {
    /// Construct a new system clock, anchored to the current instant.
    #[must_use]
    pub fn new() -> Self {
        let start_wall_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            start: std::time::Instant::now(),
            start_wall_ms,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn wall_millis(&self) -> u64 {
        self.start_wall_ms + self.start.elapsed().as_millis() as u64
    }
}

/// Deterministic clock for tests. Advances only when told to.
pub struct TestClock {
    micros: AtomicU64,
    wall_ms: AtomicU64,
}

impl TestClock {
    /// Construct a test clock starting at the given monotonic-µs / wall-ms
    /// readings.
    #[must_use]
    pub fn new(start_micros: u64, start_wall_ms: u64) -> Self {
        Self {
            micros: AtomicU64::new(start_micros),
            wall_ms: AtomicU64::new(start_wall_ms),
        }
    }

    /// Advance both clocks by the given microseconds (wall-clock advances
    /// by the equivalent number of whole milliseconds).
    pub fn advance_micros(&self, delta: u64) {
        self.micros.fetch_add(delta, Ordering::SeqCst);
        self.wall_ms.fetch_add(delta / 1_000, Ordering::SeqCst);
    }

    /// Advance the wall-clock only, e.g. to simulate a clock step.
    pub fn advance_wall_millis(&self, delta: u64) {
        self.wall_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Clock for TestClock {
    fn monotonic_micros(&self) -> u64 {
        self.micros.load(Ordering::SeqCst)
    }

    fn wall_millis(&self) -> u64 {
        self.wall_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.monotonic_micros();
        let b = clock.monotonic_micros();
        assert!(b >= a);
    }

    #[test]
    fn test_clock_advances_both_readings() {
        let clock = TestClock::new(0, 1_000);
        clock.advance_micros(5_000);
        assert_eq!(clock.monotonic_micros(), 5_000);
        assert_eq!(clock.wall_millis(), 1_005);
    }

    #[test]
    fn test_clock_wall_step_does_not_move_monotonic() {
        let clock = TestClock::new(100, 100);
        clock.advance_wall_millis(50);
        assert_eq!(clock.monotonic_micros(), 100);
        assert_eq!(clock.wall_millis(), 150);
    }
}
