//! Per-symbol pipeline (C8): ingests ticks/books, maintains the sliding
//! window, and produces the fused decision scalar the supervisor (C9)
//! gates on.

use common::{CanonicalBook, CanonicalTick, MicroMetrics, Symbol};

use crate::fusion::FusionTable;
use crate::window::SymbolWindow;

/// Owns one symbol's window and fusion table end to end: `push_tick`,
/// `push_book`, `compute`.
pub struct SymbolPipeline {
    symbol: Symbol,
    window: SymbolWindow,
    fusion: FusionTable,
    last_metrics: MicroMetrics,
}

impl SymbolPipeline {
    /// Construct a pipeline for `symbol` using the given fusion table.
    #[must_use]
    pub fn new(symbol: Symbol, fusion: FusionTable) -> Self {
        Self {
            symbol,
            window: SymbolWindow::new(),
            fusion,
            last_metrics: MicroMetrics::zero(),
        }
    }

    /// Symbol this pipeline owns.
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Ingest one tick (§4.7 "on push-tick").
    pub fn push_tick(&mut self, tick: CanonicalTick) {
        self.window.push_tick(tick);
    }

    /// Ingest one book (§4.7 "on push-book").
    pub fn push_book(&mut self, book: CanonicalBook) {
        self.window.push_book(book);
    }

    /// Recompute `MicroMetrics` from the current window state (§4.7 "on
    /// compute") and cache it.
    pub fn compute(&mut self) -> MicroMetrics {
        self.last_metrics = self.window.compute();
        self.last_metrics
    }

    /// Fuse the last computed `MicroMetrics` into the scalar signal fed to
    /// the supervisor (§4.7 decision fusion).
    #[must_use]
    pub fn fused_signal(&self) -> f64 {
        self.fusion.fuse(&self.last_metrics)
    }

    /// Most recently computed metrics, without recomputation.
    #[must_use]
    pub fn last_metrics(&self) -> MicroMetrics {
        self.last_metrics
    }

    /// Reset all window state and cached metrics to zero (symbol reset,
    /// §3).
    pub fn reset(&mut self) {
        self.window.reset();
        self.last_metrics = MicroMetrics::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Px, Qty, Ts};

    fn tick(bid: f64, ask: f64) -> CanonicalTick {
        CanonicalTick {
            symbol: Symbol::new("BTCUSDT"),
            bid: Px::new(bid),
            ask: Px::new(ask),
            bid_size: Qty::new(5.0),
            ask_size: Qty::new(3.0),
            buy_volume: Qty::new(1.0),
            sell_volume: Qty::new(0.5),
            ts_exchange: Ts::from_millis(0),
            ts_local: Ts::from_nanos(0),
        }
    }

    #[test]
    fn pipeline_computes_and_fuses_end_to_end() {
        let mut pipe = SymbolPipeline::new(Symbol::new("BTCUSDT"), FusionTable::default_weights());
        for i in 0..25 {
            pipe.push_tick(tick(100.0 + i as f64 * 0.05, 100.5 + i as f64 * 0.05));
        }
        let metrics = pipe.compute();
        assert_eq!(metrics.tick_count, 25);
        let signal = pipe.fused_signal();
        assert!(signal.is_finite());
    }

    #[test]
    fn reset_clears_cached_metrics_too() {
        let mut pipe = SymbolPipeline::new(Symbol::new("BTCUSDT"), FusionTable::default_weights());
        pipe.push_tick(tick(100.0, 101.0));
        pipe.compute();
        pipe.reset();
        assert_eq!(pipe.last_metrics().tick_count, 0);
        assert_eq!(pipe.fused_signal(), 0.0);
    }
}
