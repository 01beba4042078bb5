//! Decision fusion (§4.7, Design Notes): a tagged-variant table of
//! `{id, kernel fn, weight}` held by value, rather than a class-hierarchy
//! of strategy objects. The hot path is one pass over this table.
//!
//! The sub-signal *formulas* are explicitly out of scope (§4.7: "The
//! specific sub-signal formulas are out of scope, they are the pluggable
//! strategies"). What's in scope is the contract: every kernel reads the
//! same [`MicroMetrics`] snapshot, and the fused scalar is a weighted sum
//! fully determined by that snapshot.

use common::MicroMetrics;

/// Identifies one sub-signal kernel in the fusion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelId {
    /// Deviation of the last mid from its EMA, normalized by the EMA.
    EmaDeviation,
    /// Top-of-book imbalance, read directly from `MicroMetrics`.
    TopImbalance,
    /// Short-term drift: the 20-tick trend score.
    ShortTermDrift,
    /// Burst in traded volume relative to its EMA.
    VolumeBurst,
    /// Composite book pressure, read directly from `MicroMetrics`.
    BookPressure,
}

/// A single sub-signal kernel: a pure function over one `MicroMetrics`
/// snapshot, expected to return a value roughly in `[-1, 1]`.
pub type Kernel = fn(&MicroMetrics) -> f64;

fn ema_deviation(m: &MicroMetrics) -> f64 {
    if m.mid_ema.abs() > f64::EPSILON {
        ((m.last_mid - m.mid_ema) / m.mid_ema).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn top_imbalance(m: &MicroMetrics) -> f64 {
    m.top_imbalance.clamp(-1.0, 1.0)
}

fn short_term_drift(m: &MicroMetrics) -> f64 {
    m.trend_score.clamp(-1.0, 1.0)
}

fn volume_burst(m: &MicroMetrics) -> f64 {
    if m.volume_ema.abs() > f64::EPSILON {
        ((m.volume_ema - m.mid_var_20) / m.volume_ema.max(1.0)).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn book_pressure(m: &MicroMetrics) -> f64 {
    m.composite_pressure.clamp(-1.0, 1.0)
}

/// Look up the built-in kernel function for a [`KernelId`].
#[must_use]
pub fn kernel_fn(id: KernelId) -> Kernel {
    match id {
        KernelId::EmaDeviation => ema_deviation,
        KernelId::TopImbalance => top_imbalance,
        KernelId::ShortTermDrift => short_term_drift,
        KernelId::VolumeBurst => volume_burst,
        KernelId::BookPressure => book_pressure,
    }
}

/// A weighted table of sub-signal kernels. Declared from configuration
/// (§4.7: "per-sub-signal weights declared in configuration"); the fused
/// output is a plain weighted sum, no dispatch through a trait object.
#[derive(Clone)]
pub struct FusionTable {
    entries: Vec<(KernelId, Kernel, f64)>,
}

impl FusionTable {
    /// Build a table from `(id, weight)` pairs, resolving each id to its
    /// kernel function.
    #[must_use]
    pub fn new(weights: &[(KernelId, f64)]) -> Self {
        let entries = weights
            .iter()
            .map(|&(id, weight)| (id, kernel_fn(id), weight))
            .collect();
        Self { entries }
    }

    /// The default table: all five built-in kernels, equally weighted.
    #[must_use]
    pub fn default_weights() -> Self {
        Self::new(&[
            (KernelId::EmaDeviation, 0.2),
            (KernelId::TopImbalance, 0.2),
            (KernelId::ShortTermDrift, 0.2),
            (KernelId::VolumeBurst, 0.2),
            (KernelId::BookPressure, 0.2),
        ])
    }

    /// Fuse every kernel's output over `metrics` into one scalar via a
    /// weighted sum. This is the one pass over the table the hot path
    /// takes (Design Note).
    #[must_use]
    pub fn fuse(&self, metrics: &MicroMetrics) -> f64 {
        self.entries
            .iter()
            .map(|&(_, kernel, weight)| weight * kernel(metrics))
            .sum()
    }
}

impl Default for FusionTable {
    fn default() -> Self {
        Self::default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuse_is_a_weighted_sum_of_kernel_outputs() {
        let mut m = MicroMetrics::zero();
        m.top_imbalance = 0.5;
        m.trend_score = 0.25;

        let table = FusionTable::new(&[(KernelId::TopImbalance, 0.6), (KernelId::ShortTermDrift, 0.4)]);
        let fused = table.fuse(&m);
        assert!((fused - (0.6 * 0.5 + 0.4 * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn fused_value_is_fully_determined_by_micrometrics() {
        let mut m = MicroMetrics::zero();
        m.top_imbalance = 0.3;
        let table = FusionTable::default_weights();
        let a = table.fuse(&m);
        let b = table.fuse(&m);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_metrics_fuse_to_zero() {
        let m = MicroMetrics::zero();
        let table = FusionTable::default_weights();
        assert_eq!(table.fuse(&m), 0.0);
    }
}
