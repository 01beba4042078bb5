//! Position/notional tracking (§5: "Position trackers are read by risk and
//! written only by OMS FSM -- a single-writer, multi-reader pattern guarded
//! by the per-symbol mutex").

use std::collections::HashMap;
use std::sync::Mutex;

use common::{Px, Qty, Side, Symbol};

/// A read-only snapshot of one symbol's position, for risk's projection
/// checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSnapshot {
    /// Signed position size: positive long, negative short.
    pub size: f64,
    /// Absolute notional exposure (`|size| * last price`).
    pub notional: f64,
}

struct SymbolPosition {
    size: f64,
    last_price: f64,
}

/// Owns per-symbol signed position size and notional exposure, plus the
/// running global notional total. The OMS FSM is the sole writer (via
/// [`Self::apply_fill`]); risk reads through [`Self::snapshot`] /
/// [`Self::global_notional`].
pub struct PositionTracker {
    positions: Mutex<HashMap<Symbol, SymbolPosition>>,
}

impl PositionTracker {
    /// Construct an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            positions: Mutex::new(HashMap::new()),
        }
    }

    /// Apply a fill: `qty` traded at `price` on `side`, adjusting the
    /// symbol's signed position (buys increase, sells decrease).
    pub fn apply_fill(&self, symbol: Symbol, side: Side, qty: Qty, price: Px) {
        let mut guard = self.positions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = guard.entry(symbol).or_insert(SymbolPosition {
            size: 0.0,
            last_price: 0.0,
        });
        let signed = match side {
            Side::Bid => qty.as_f64(),
            Side::Ask => -qty.as_f64(),
        };
        entry.size += signed;
        entry.last_price = price.as_f64();
    }

    /// Snapshot of `symbol`'s current position/notional.
    #[must_use]
    pub fn snapshot(&self, symbol: Symbol) -> PositionSnapshot {
        let guard = self.positions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.get(&symbol).map_or(PositionSnapshot::default(), |p| PositionSnapshot {
            size: p.size,
            notional: p.size.abs() * p.last_price,
        })
    }

    /// Sum of notional exposure across every symbol currently tracked.
    #[must_use]
    pub fn global_notional(&self) -> f64 {
        let guard = self.positions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.values().map(|p| p.size.abs() * p.last_price).sum()
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_then_sell_nets_position() {
        let tracker = PositionTracker::new();
        let sym = Symbol::new("BTCUSDT");
        tracker.apply_fill(sym, Side::Bid, Qty::new(10.0), Px::new(100.0));
        tracker.apply_fill(sym, Side::Ask, Qty::new(4.0), Px::new(101.0));
        let snap = tracker.snapshot(sym);
        assert_eq!(snap.size, 6.0);
        assert!((snap.notional - 6.0 * 101.0).abs() < 1e-9);
    }

    #[test]
    fn global_notional_sums_across_symbols() {
        let tracker = PositionTracker::new();
        tracker.apply_fill(Symbol::new("BTCUSDT"), Side::Bid, Qty::new(1.0), Px::new(100.0));
        tracker.apply_fill(Symbol::new("ETHUSDT"), Side::Bid, Qty::new(2.0), Px::new(50.0));
        assert!((tracker.global_notional() - 200.0).abs() < 1e-9);
    }
}
