//! Per-symbol sliding windows (§4.7): bounded tick/book deques (drop-oldest
//! at capacity) plus the exponentially-weighted averages derived from them.

use std::collections::VecDeque;

use common::{CanonicalBook, CanonicalTick, MicroMetrics};

/// Cap on the recent-tick and recent-book deques (§4.7: "≤1000").
pub const MAX_HISTORY: usize = 1000;

/// Minimum ticks required before momentum/volatility are computed (§4.7).
pub const MIN_TICKS_FOR_STATS: usize = 20;

/// Decay factor for the OFI accumulator (§4.7: "0.95 decay").
pub const OFI_DECAY: f64 = 0.95;

/// EMA smoothing factor shared by mid/spread/volume EMAs. Not specified
/// numerically in §4.7 beyond "exponentially-weighted"; a conventional
/// 20-period-equivalent alpha is used.
pub const EMA_ALPHA: f64 = 2.0 / (20.0 + 1.0);

/// Threshold volatility-ratio divisor and multiplier for the shock flag
/// (§4.7: `volatility / 0.001 > 3.0`).
pub const SHOCK_VOL_REFERENCE: f64 = 0.001;
/// Shock trigger multiple.
pub const SHOCK_MULTIPLE: f64 = 3.0;

/// Bounded recent-history windows plus running EMAs for one symbol.
pub struct SymbolWindow {
    ticks: VecDeque<CanonicalTick>,
    books: VecDeque<CanonicalBook>,
    mid_ema: f64,
    spread_ema: f64,
    volume_ema: f64,
    ofi_accum: f64,
    initialized: bool,
}

impl SymbolWindow {
    /// A fresh window with no history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ticks: VecDeque::with_capacity(MAX_HISTORY),
            books: VecDeque::with_capacity(MAX_HISTORY),
            mid_ema: 0.0,
            spread_ema: 0.0,
            volume_ema: 0.0,
            ofi_accum: 0.0,
            initialized: false,
        }
    }

    /// Append a tick, dropping the oldest if at capacity, and update the
    /// EMAs and the OFI accumulator.
    pub fn push_tick(&mut self, tick: CanonicalTick) {
        let mid = (tick.bid.as_f64() + tick.ask.as_f64()) / 2.0;
        let spread = tick.spread();
        let volume = tick.buy_volume.as_f64() + tick.sell_volume.as_f64();

        if self.initialized {
            self.mid_ema += EMA_ALPHA * (mid - self.mid_ema);
            self.spread_ema += EMA_ALPHA * (spread - self.spread_ema);
            self.volume_ema += EMA_ALPHA * (volume - self.volume_ema);
        } else {
            self.mid_ema = mid;
            self.spread_ema = spread;
            self.volume_ema = volume;
            self.initialized = true;
        }

        if let Some(prev) = self.ticks.back() {
            let d_bid = tick.bid_size.as_f64() - prev.bid_size.as_f64();
            let d_ask = tick.ask_size.as_f64() - prev.ask_size.as_f64();
            self.ofi_accum = self.ofi_accum * OFI_DECAY + (d_bid - d_ask);
        }

        if self.ticks.len() == MAX_HISTORY {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
    }

    /// Append a book, dropping the oldest if at capacity.
    pub fn push_book(&mut self, book: CanonicalBook) {
        if self.books.len() == MAX_HISTORY {
            self.books.pop_front();
        }
        self.books.push_back(book);
    }

    /// Number of ticks currently retained.
    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    /// Most recent book, if any.
    #[must_use]
    pub fn latest_book(&self) -> Option<&CanonicalBook> {
        self.books.back()
    }

    /// Most recent tick, if any.
    #[must_use]
    pub fn latest_tick(&self) -> Option<&CanonicalTick> {
        self.ticks.back()
    }

    /// Reset all state to empty/zero (symbol reset, §3).
    pub fn reset(&mut self) {
        self.ticks.clear();
        self.books.clear();
        self.mid_ema = 0.0;
        self.spread_ema = 0.0;
        self.volume_ema = 0.0;
        self.ofi_accum = 0.0;
        self.initialized = false;
    }

    /// Compute a fresh [`MicroMetrics`] snapshot from the current window
    /// state. Momentum/volatility require at least
    /// [`MIN_TICKS_FOR_STATS`] ticks; absent that, those fields (and
    /// `mid_mean_20`/`mid_var_20`) stay at zero.
    #[must_use]
    pub fn compute(&self) -> MicroMetrics {
        let mut m = MicroMetrics::zero();
        m.tick_count = self.ticks.len() as u64;
        m.ofi_accum = self.ofi_accum;
        m.mid_ema = self.mid_ema;
        m.spread_ema = self.spread_ema;
        m.volume_ema = self.volume_ema;

        if let Some(tick) = self.ticks.back() {
            m.last_mid = (tick.bid.as_f64() + tick.ask.as_f64()) / 2.0;
            m.last_spread = tick.spread();
            let bid_sz = tick.bid_size.as_f64();
            let ask_sz = tick.ask_size.as_f64();
            if bid_sz + ask_sz > 0.0 {
                m.top_imbalance = (bid_sz - ask_sz) / (bid_sz + ask_sz);
            }
        }

        if let Some(book) = self.books.back() {
            if let Some(pressure) = book.composite_pressure() {
                m.composite_pressure = pressure;
            }
            if let Some(depth_imb) = book.imbalance(common::DEPTH) {
                m.depth_ratio = depth_imb;
            }
        }

        if self.ticks.len() >= MIN_TICKS_FOR_STATS {
            let last_20: Vec<f64> = self
                .ticks
                .iter()
                .rev()
                .take(MIN_TICKS_FOR_STATS)
                .map(|t| (t.bid.as_f64() + t.ask.as_f64()) / 2.0)
                .collect();
            let mean: f64 = last_20.iter().sum::<f64>() / last_20.len() as f64;
            let variance: f64 =
                last_20.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / last_20.len() as f64;
            let volatility = variance.sqrt();

            m.mid_mean_20 = mean;
            m.mid_var_20 = variance;
            m.trend_score = if mean.abs() > f64::EPSILON {
                (m.last_mid - mean) / mean
            } else {
                0.0
            };
            m.volatility_ratio = volatility;
            m.shock_flag = volatility / SHOCK_VOL_REFERENCE > SHOCK_MULTIPLE;
        }

        m
    }
}

impl Default for SymbolWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Px, Qty, Symbol, Ts};

    fn tick(bid: f64, ask: f64, bid_sz: f64, ask_sz: f64) -> CanonicalTick {
        CanonicalTick {
            symbol: Symbol::new("BTCUSDT"),
            bid: Px::new(bid),
            ask: Px::new(ask),
            bid_size: Qty::new(bid_sz),
            ask_size: Qty::new(ask_sz),
            buy_volume: Qty::new(1.0),
            sell_volume: Qty::new(1.0),
            ts_exchange: Ts::from_millis(0),
            ts_local: Ts::from_nanos(0),
        }
    }

    #[test]
    fn fewer_than_twenty_ticks_leaves_stats_at_zero() {
        let mut w = SymbolWindow::new();
        for _ in 0..5 {
            w.push_tick(tick(100.0, 101.0, 1.0, 1.0));
        }
        let m = w.compute();
        assert_eq!(m.trend_score, 0.0);
        assert_eq!(m.volatility_ratio, 0.0);
        assert!(!m.shock_flag);
    }

    #[test]
    fn twenty_ticks_produce_momentum_and_volatility() {
        let mut w = SymbolWindow::new();
        for i in 0..25 {
            let px = 100.0 + i as f64 * 0.1;
            w.push_tick(tick(px, px + 1.0, 1.0, 1.0));
        }
        let m = w.compute();
        assert!(m.mid_var_20 > 0.0);
        assert_ne!(m.trend_score, 0.0);
    }

    #[test]
    fn drop_oldest_keeps_capacity_bounded() {
        let mut w = SymbolWindow::new();
        for _ in 0..(MAX_HISTORY + 50) {
            w.push_tick(tick(100.0, 101.0, 1.0, 1.0));
        }
        assert_eq!(w.tick_count(), MAX_HISTORY);
    }

    #[test]
    fn reset_clears_all_state() {
        let mut w = SymbolWindow::new();
        w.push_tick(tick(100.0, 101.0, 1.0, 1.0));
        w.reset();
        assert_eq!(w.tick_count(), 0);
        assert_eq!(w.compute().mid_ema, 0.0);
    }
}
