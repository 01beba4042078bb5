//! Core scalar types: symbols, prices, quantities, timestamps, order ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-width symbol identifier.
///
/// Stored as 16 raw bytes (ASCII, upper-cased, NUL-padded) so it can be
/// copied across queues without allocation, per the data model's "fixed
/// 16-byte identifier" requirement.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol([u8; 16]);

impl Symbol {
    /// Build a symbol from a venue-supplied name, upper-cased and truncated
    /// to 16 bytes.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut buf = [0u8; 16];
        for (dst, src) in buf.iter_mut().zip(name.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        Self(buf)
    }

    /// View the symbol as a `&str` (trailing NUL padding stripped).
    #[must_use]
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(16);
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price. Backed by `f64` but also exposes a tick-scaled integer view
/// (`TICK_SCALE` subdivisions per unit) for code that wants exact integer
/// arithmetic on the hot path (order book level comparisons, imbalance).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Px(pub f64);

/// Subdivisions per price unit used by [`Px::as_ticks`] / [`Px::from_ticks`].
pub const TICK_SCALE: f64 = 10_000.0;

impl Px {
    /// Create a new price.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Zero price, used as a sentinel for "level absent".
    #[must_use]
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Price as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Price as an integer tick count (`TICK_SCALE` per unit).
    #[must_use]
    pub fn as_ticks(&self) -> i64 {
        (self.0 * TICK_SCALE).round() as i64
    }

    /// Build a price from an integer tick count.
    #[must_use]
    pub fn from_ticks(ticks: i64) -> Self {
        Self(ticks as f64 / TICK_SCALE)
    }

    /// Whether this is the "level absent" sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Quantity / size.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Qty(pub f64);

impl Qty {
    /// Create a new quantity.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Zero quantity, used as a sentinel for "level absent".
    #[must_use]
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Quantity as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Whether this is the "level absent" sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl std::ops::Add for Qty {
    type Output = Qty;
    fn add(self, rhs: Qty) -> Qty {
        Qty(self.0 + rhs.0)
    }
}

/// A timestamp in nanoseconds. Used for both venue-supplied wall-clock
/// timestamps and for values produced by [`crate::clock::Clock`] -- callers
/// must be careful not to mix the two kinds (see `crate::clock`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ts(pub u64);

impl Ts {
    /// Build a timestamp from a raw nanosecond count.
    #[must_use]
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Build a timestamp from a millisecond count (e.g. a FIX `52`/`60` or
    /// a Binance `E` field).
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Raw nanosecond count.
    #[must_use]
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Microsecond count (truncating).
    #[must_use]
    pub fn as_micros(&self) -> u64 {
        self.0 / 1_000
    }

    /// Millisecond count (truncating).
    #[must_use]
    pub fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Generates monotonically increasing client-order-ids of the form
/// `<prefix><monotonic-ms>_<counter>` (§4.9).
pub struct ClientOrderIdGen {
    prefix: &'static str,
    counter: AtomicU64,
}

impl ClientOrderIdGen {
    /// Create a new generator. `prefix` is a short static tag (e.g. `"OR"`).
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(0),
        }
    }

    /// Generate the next client-order-id given the current monotonic
    /// millisecond clock reading.
    pub fn next(&self, now_ms: u64) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}_{}", self.prefix, now_ms, n)
    }
}
