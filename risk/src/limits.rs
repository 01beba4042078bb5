//! Risk gating configuration (§4.8). Loaded from `engine`'s `risk.*`
//! config keys; defaults here match spec.md's stated defaults.

/// The eight gates in §4.8, evaluated in order with default thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    /// Minimum time between two approvals, milliseconds. Default 250ms.
    pub cooldown_ms: u64,
    /// Token-bucket refill rate: tokens per second (also the bucket
    /// capacity, §8 B1 "max=50/s").
    pub max_ops_per_sec: u32,
    /// Maximum absolute position size per symbol.
    pub max_position_size: f64,
    /// Maximum total notional exposure across all symbols.
    pub max_global_notional: f64,
    /// Maximum notional exposure on any single symbol.
    pub max_notional_per_symbol: f64,
    /// Maximum drawdown, as a fraction of peak PnL, before the kill-switch
    /// trips.
    pub max_drawdown_pct: f64,
    /// Maximum daily realized loss (positive number) before the
    /// kill-switch trips.
    pub max_daily_loss: f64,
    /// Minimum signal magnitude required to approve an intent.
    pub min_confidence: f64,
}

impl RiskLimits {
    /// Conservative defaults matching spec.md §4.8's stated values where
    /// given; the exposure/position/drawdown figures are operator-tuned
    /// and have no mandated default, so generous placeholders are used
    /// until config overrides them.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            cooldown_ms: 250,
            max_ops_per_sec: 50,
            max_position_size: 1_000.0,
            max_global_notional: 1_000_000.0,
            max_notional_per_symbol: 250_000.0,
            max_drawdown_pct: 0.2,
            max_daily_loss: 50_000.0,
            min_confidence: 0.05,
        }
    }
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self::defaults()
    }
}
