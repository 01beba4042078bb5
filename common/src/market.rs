//! Canonical, venue-agnostic market data model: normalized book updates,
//! ticks, and the side enum shared by the order book and the OMS.

use crate::types::{Px, Qty, Symbol, Ts};
use serde::{Deserialize, Serialize};

/// Quote or order side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy side (bid).
    Bid,
    /// Sell side (ask/offer).
    Ask,
}

/// Normalized L2 update (absolute replace at a price level), produced by
/// C7's venue decoders and consumed by `lob::OrderBook::apply`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct L2Update {
    /// Event timestamp in nanoseconds.
    pub ts: Ts,
    /// Trading symbol.
    pub symbol: Symbol,
    /// Side of the book.
    pub side: Side,
    /// Price level.
    pub price: Px,
    /// Quantity at this level (0 = remove level).
    pub qty: Qty,
    /// Level index (0 = best), when the venue supplies one.
    pub level: u8,
}

impl L2Update {
    /// Create a new L2 update.
    #[must_use]
    pub fn new(ts: Ts, symbol: Symbol, side: Side, price: Px, qty: Qty, level: u8) -> Self {
        Self {
            ts,
            symbol,
            side,
            price,
            qty,
            level,
        }
    }

    /// Whether this update removes a level.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.qty.is_zero()
    }
}

/// Number of price levels kept per side of a [`CanonicalBook`].
pub const DEPTH: usize = 10;

/// A single normalized quote event (§3 `CanonicalTick`).
///
/// Immutable once emitted by the normalizer (C7); copied by value across
/// the per-symbol queues that feed the pipeline (C8).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTick {
    /// Instrument identifier.
    pub symbol: Symbol,
    /// Best bid price.
    pub bid: Px,
    /// Best ask price.
    pub ask: Px,
    /// Best bid size.
    pub bid_size: Qty,
    /// Best ask size.
    pub ask_size: Qty,
    /// Cumulative buy volume since the previous tick.
    pub buy_volume: Qty,
    /// Cumulative sell volume since the previous tick.
    pub sell_volume: Qty,
    /// Venue-supplied timestamp, milliseconds. Zero if the venue omitted it.
    pub ts_exchange: Ts,
    /// Local normalization timestamp, microseconds (monotonic clock).
    pub ts_local: Ts,
}

impl CanonicalTick {
    /// Spread, derived: `ask - bid`.
    #[must_use]
    pub fn spread(&self) -> f64 {
        self.ask.as_f64() - self.bid.as_f64()
    }
}

/// One level of a [`CanonicalBook`]. `size == 0` means the level is absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price. Meaningless (zero) when `size` is zero.
    pub price: Px,
    /// Level size. Zero means the level is absent.
    pub size: Qty,
}

impl PriceLevel {
    /// An absent level.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            price: Px::zero(),
            size: Qty::zero(),
        }
    }

    /// Whether this level carries no size.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.size.is_zero()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::empty()
    }
}

/// A canonical top-`N` order book (§3 `CanonicalBook`), `N` = [`DEPTH`].
///
/// Bids are stored descending by price, asks ascending. A level with
/// `size == 0` means "absent" rather than being removed from the array, so
/// the representation is always exactly `DEPTH` slots per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalBook {
    /// Instrument identifier.
    pub symbol: Symbol,
    /// Bid levels, descending by price; `bids[0]` is best bid.
    pub bids: [PriceLevel; DEPTH],
    /// Ask levels, ascending by price; `asks[0]` is best ask.
    pub asks: [PriceLevel; DEPTH],
    /// Venue-supplied timestamp, milliseconds.
    pub ts_exchange: Ts,
    /// Local normalization timestamp, microseconds.
    pub ts_local: Ts,
}

impl CanonicalBook {
    /// An empty book for `symbol`, all levels absent.
    #[must_use]
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: [PriceLevel::empty(); DEPTH],
            asks: [PriceLevel::empty(); DEPTH],
            ts_exchange: Ts::from_nanos(0),
            ts_local: Ts::from_nanos(0),
        }
    }

    /// Best bid level, if present.
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        (!self.bids[0].is_absent()).then_some(self.bids[0])
    }

    /// Best ask level, if present.
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        (!self.asks[0].is_absent()).then_some(self.asks[0])
    }

    /// Whether the book is crossed: `bid[0] >= ask[0]` while both present.
    /// Per I4 this must never be true for a valid snapshot.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => b.price.as_f64() >= a.price.as_f64(),
            _ => false,
        }
    }

    /// Mid price of best bid/ask, or `None` if either side is empty.
    #[must_use]
    pub fn mid(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b.price.as_f64() + a.price.as_f64()) / 2.0),
            _ => None,
        }
    }

    /// Size-weighted mid of the best bid/ask (microprice).
    #[must_use]
    pub fn microprice(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => {
                let total = b.size.as_f64() + a.size.as_f64();
                if total <= 0.0 {
                    return None;
                }
                Some(
                    (b.price.as_f64() * a.size.as_f64() + a.price.as_f64() * b.size.as_f64())
                        / total,
                )
            }
            _ => None,
        }
    }

    /// Spread between best ask and best bid, or `None` if either side empty.
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some(a.price.as_f64() - b.price.as_f64()),
            _ => None,
        }
    }

    /// Depth imbalance over the top `depth` levels of each side:
    /// `(sum_bid - sum_ask) / (sum_bid + sum_ask)`.
    #[must_use]
    pub fn imbalance(&self, depth: usize) -> Option<f64> {
        let depth = depth.min(DEPTH);
        let sum_bid: f64 = self.bids[..depth].iter().map(|l| l.size.as_f64()).sum();
        let sum_ask: f64 = self.asks[..depth].iter().map(|l| l.size.as_f64()).sum();
        let total = sum_bid + sum_ask;
        if total <= 0.0 {
            return None;
        }
        Some((sum_bid - sum_ask) / total)
    }

    /// Near-depth imbalance over the top 3 levels.
    #[must_use]
    pub fn near_depth_imbalance(&self) -> Option<f64> {
        self.imbalance(3)
    }

    /// Composite pressure: `0.6 * depth_imbalance(DEPTH) + 0.4 * near_depth_imbalance()`.
    #[must_use]
    pub fn composite_pressure(&self) -> Option<f64> {
        let depth_imb = self.imbalance(DEPTH)?;
        let near_imb = self.near_depth_imbalance()?;
        Some(0.6 * depth_imb + 0.4 * near_imb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: f64, size: f64) -> PriceLevel {
        PriceLevel {
            price: Px::new(price),
            size: Qty::new(size),
        }
    }

    #[test]
    fn empty_book_has_no_mid() {
        let book = CanonicalBook::empty(Symbol::new("BTCUSDT"));
        assert_eq!(book.mid(), None);
        assert!(!book.is_crossed());
    }

    #[test]
    fn uncrossed_book_reports_mid_and_spread() {
        let mut book = CanonicalBook::empty(Symbol::new("BTCUSDT"));
        book.bids[0] = level(100.0, 7.0);
        book.bids[1] = level(99.0, 3.0);
        book.asks[0] = level(101.0, 4.0);
        book.asks[1] = level(102.0, 2.0);

        assert!(!book.is_crossed());
        assert_eq!(book.mid(), Some(100.5));
        assert_eq!(book.spread(), Some(1.0));
        let imb = book.imbalance(2).unwrap();
        assert!((imb - (10.0 - 6.0) / 16.0).abs() < 1e-9);
    }

    #[test]
    fn crossed_book_is_detected() {
        let mut book = CanonicalBook::empty(Symbol::new("BTCUSDT"));
        book.bids[0] = level(101.0, 1.0);
        book.asks[0] = level(100.0, 1.0);
        assert!(book.is_crossed());
    }

    #[test]
    fn composite_pressure_blends_depth_and_near_depth() {
        let mut book = CanonicalBook::empty(Symbol::new("ETHUSDT"));
        for i in 0..DEPTH {
            book.bids[i] = level(100.0 - i as f64, 1.0);
            book.asks[i] = level(101.0 + i as f64, 1.0);
        }
        let pressure = book.composite_pressure().unwrap();
        let depth_imb = book.imbalance(DEPTH).unwrap();
        let near_imb = book.near_depth_imbalance().unwrap();
        assert!((pressure - (0.6 * depth_imb + 0.4 * near_imb)).abs() < 1e-9);
    }

    #[test]
    fn tick_spread_is_derived_from_bid_ask() {
        let tick = CanonicalTick {
            symbol: Symbol::new("BTCUSDT"),
            bid: Px::new(100.0),
            ask: Px::new(100.5),
            bid_size: Qty::new(1.0),
            ask_size: Qty::new(1.0),
            buy_volume: Qty::zero(),
            sell_volume: Qty::zero(),
            ts_exchange: Ts::from_millis(0),
            ts_local: Ts::from_nanos(0),
        };
        assert!((tick.spread() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn l2_update_removal_flag() {
        let upd = L2Update::new(
            Ts::from_nanos(1),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Px::new(100.0),
            Qty::zero(),
            0,
        );
        assert!(upd.is_removal());
    }
}
