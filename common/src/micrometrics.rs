//! `MicroMetrics`: the fixed-arity numeric vector C8 maintains per symbol.

use serde::{Deserialize, Serialize};

/// Number of opaque per-sub-detector slots at the tail of [`MicroMetrics`],
/// reserved for sub-signal kernels that need scratch state beyond the named
/// fields (§4.7's "each sub-signal is a small arithmetic kernel").
pub const DETECTOR_SLOTS: usize = 16;

/// Minimum total slot count required by §3 ("≥ 32 slots"): the 16 named
/// fields below plus [`DETECTOR_SLOTS`] opaque ones.
pub const MIN_SLOTS: usize = 32;

/// Fixed-arity microstructure summary for one symbol, updated in-place by
/// the pipeline (C8) on every `compute()` and reset to zeroes on symbol
/// reset.
///
/// The named fields are the ones every sub-signal kernel reads; the
/// trailing `detectors` array is scratch space indexed by kernel id so new
/// kernels can carry per-symbol state without widening this struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicroMetrics {
    /// Running order-flow-imbalance accumulator (0.95 decay).
    pub ofi_accum: f64,
    /// Volume-probability-of-informed-trading proxy.
    pub vpin_proxy: f64,
    /// Top-of-book imbalance, `(bid_size - ask_size) / (bid_size + ask_size)`.
    pub top_imbalance: f64,
    /// Depth ratio across the book's configured depth.
    pub depth_ratio: f64,
    /// Short-term trend score (normalized momentum).
    pub trend_score: f64,
    /// Volatility ratio (rolling std-dev over a reference scale).
    pub volatility_ratio: f64,
    /// Set when `volatility_ratio` exceeds the shock threshold.
    pub shock_flag: bool,
    /// 20-point rolling mean of mid price.
    pub mid_mean_20: f64,
    /// 20-point rolling variance of mid price.
    pub mid_var_20: f64,
    /// Last observed mid price.
    pub last_mid: f64,
    /// Last observed spread.
    pub last_spread: f64,
    /// EMA of mid price.
    pub mid_ema: f64,
    /// EMA of spread.
    pub spread_ema: f64,
    /// EMA of traded volume.
    pub volume_ema: f64,
    /// Composite book pressure, carried through from the last book update.
    pub composite_pressure: f64,
    /// Count of ticks observed since the last reset (diagnostic, not a
    /// sub-signal input).
    pub tick_count: u64,
    /// Opaque scratch slots for additional sub-detectors, indexed by
    /// kernel id.
    pub detectors: [f64; DETECTOR_SLOTS],
}

impl MicroMetrics {
    /// All-zero metrics, as produced on symbol reset.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            ofi_accum: 0.0,
            vpin_proxy: 0.0,
            top_imbalance: 0.0,
            depth_ratio: 0.0,
            trend_score: 0.0,
            volatility_ratio: 0.0,
            shock_flag: false,
            mid_mean_20: 0.0,
            mid_var_20: 0.0,
            last_mid: 0.0,
            last_spread: 0.0,
            mid_ema: 0.0,
            spread_ema: 0.0,
            volume_ema: 0.0,
            composite_pressure: 0.0,
            tick_count: 0,
            detectors: [0.0; DETECTOR_SLOTS],
        }
    }

    /// Total addressable slot count: named fields plus opaque detectors.
    /// Satisfies the §3 requirement of `>= 32` slots.
    #[must_use]
    pub const fn slot_count() -> usize {
        MIN_SLOTS
    }
}

impl Default for MicroMetrics {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_metrics_has_no_shock() {
        let m = MicroMetrics::zero();
        assert!(!m.shock_flag);
        assert_eq!(m.tick_count, 0);
    }

    #[test]
    fn slot_count_meets_spec_minimum() {
        assert!(MicroMetrics::slot_count() >= 32);
    }

    #[test]
    fn serde_roundtrip() {
        let mut m = MicroMetrics::zero();
        m.trend_score = 0.42;
        m.detectors[0] = 1.5;
        let encoded = bincode::serialize(&m).unwrap();
        let decoded: MicroMetrics = bincode::deserialize(&encoded).unwrap();
        assert_eq!(m, decoded);
    }
}
