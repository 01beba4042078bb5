//! Per-symbol normalization state shared by both venue decoders: applies
//! [`common::L2Update`]s to an [`lob::OrderBook`] and derives the unified
//! [`common::CanonicalTick`] (§4.6's "after each update compute mid,
//! spread, top-imb, near-depth-imb, composite pressure").

use common::{CanonicalBook, CanonicalTick, L2Update, PriceLevel, Px, Qty, Side, Symbol, Ts};
use lob::{BookError, OrderBook};
use thiserror::Error;

/// Errors raised while normalizing venue data for one symbol.
#[derive(Debug, Error)]
pub enum NormalizerError {
    /// The underlying order book rejected an update.
    #[error("order book update rejected: {0}")]
    Book(#[from] BookError),
}

/// Owns one symbol's reconstructed book plus the rolling buy/sell volume
/// accumulator that resets each time a [`CanonicalTick`] is emitted (§3:
/// "rolling buy/sell volume since last tick").
pub struct SymbolNormalizer {
    book: OrderBook,
    buy_volume: f64,
    sell_volume: f64,
}

impl SymbolNormalizer {
    /// Construct a normalizer for `symbol` with an empty book.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            book: OrderBook::new(symbol),
            buy_volume: 0.0,
            sell_volume: 0.0,
        }
    }

    /// Apply a single normalized snapshot (`35=W`) level, by position
    /// within the snapshot currently being replayed.
    pub fn apply_snapshot_update(&mut self, update: &L2Update) -> Result<(), NormalizerError> {
        self.book.apply(update)?;
        Ok(())
    }

    /// Apply a single normalized incremental (`35=X`) level update, matched
    /// against the book by price rather than by position (§4.6).
    pub fn apply_incremental_update(&mut self, update: &L2Update) -> Result<(), NormalizerError> {
        self.book.apply_incremental(update)?;
        Ok(())
    }

    /// Reset the book to empty before replaying a full snapshot (35=W
    /// behavior: "Snapshots rebuild the book").
    pub fn reset_book(&mut self, ts: Ts) {
        let symbol = self.book.symbol;
        self.book = OrderBook::new(symbol);
        self.book.ts = ts;
    }

    /// Record trade volume attributable to the aggressor side, to be
    /// folded into the next emitted tick.
    pub fn record_trade(&mut self, side: Side, qty: Qty) {
        match side {
            Side::Bid => self.buy_volume += qty.as_f64(),
            Side::Ask => self.sell_volume += qty.as_f64(),
        }
    }

    /// Current canonical book snapshot (read-only view for the pipeline's
    /// book deque).
    #[must_use]
    pub fn canonical_book(&self) -> CanonicalBook {
        let mut out = CanonicalBook::empty(self.book.symbol);
        out.ts_exchange = self.book.ts;
        out.ts_local = self.book.ts;
        for i in 0..lob::DEPTH {
            out.bids[i] = PriceLevel {
                price: self.book.bids.prices[i],
                size: self.book.bids.qtys[i],
            };
            out.asks[i] = PriceLevel {
                price: self.book.asks.prices[i],
                size: self.book.asks.qtys[i],
            };
        }
        out
    }

    /// Emit a [`CanonicalTick`] from the current book state, folding in
    /// and then resetting the rolling trade-volume accumulators.
    /// `ts_exchange` is the venue-supplied timestamp if present, else 0
    /// (§4.6); `ts_local` is always the caller's monotonic clock reading.
    pub fn emit_tick(&mut self, ts_exchange: Ts, ts_local: Ts) -> CanonicalTick {
        let book = &self.book;
        let (bid, bid_size) = level_or_zero(book.bids.prices[0], book.bids.qtys[0]);
        let (ask, ask_size) = level_or_zero(book.asks.prices[0], book.asks.qtys[0]);

        let tick = CanonicalTick {
            symbol: book.symbol,
            bid,
            ask,
            bid_size,
            ask_size,
            buy_volume: Qty::new(self.buy_volume),
            sell_volume: Qty::new(self.sell_volume),
            ts_exchange,
            ts_local,
        };
        self.buy_volume = 0.0;
        self.sell_volume = 0.0;
        tick
    }
}

fn level_or_zero(price: Px, qty: Qty) -> (Px, Qty) {
    if qty.is_zero() {
        (Px::zero(), Qty::zero())
    } else {
        (price, qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_then_tick_reports_top_of_book() {
        let mut norm = SymbolNormalizer::new(Symbol::new("BTCUSDT"));
        norm.apply_snapshot_update(&L2Update::new(
            Ts::from_nanos(1),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Px::new(100.0),
            Qty::new(5.0),
            0,
        ))
        .unwrap();
        norm.apply_snapshot_update(&L2Update::new(
            Ts::from_nanos(1),
            Symbol::new("BTCUSDT"),
            Side::Ask,
            Px::new(101.0),
            Qty::new(4.0),
            0,
        ))
        .unwrap();

        let tick = norm.emit_tick(Ts::from_millis(0), Ts::from_nanos(42));
        assert_eq!(tick.bid.as_f64(), 100.0);
        assert_eq!(tick.ask.as_f64(), 101.0);
        assert!((tick.spread() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trade_volume_accumulates_and_resets_after_emit() {
        let mut norm = SymbolNormalizer::new(Symbol::new("BTCUSDT"));
        norm.record_trade(Side::Bid, Qty::new(2.0));
        norm.record_trade(Side::Bid, Qty::new(1.0));
        norm.record_trade(Side::Ask, Qty::new(3.0));

        let tick = norm.emit_tick(Ts::from_millis(0), Ts::from_nanos(0));
        assert_eq!(tick.buy_volume.as_f64(), 3.0);
        assert_eq!(tick.sell_volume.as_f64(), 3.0);

        let tick2 = norm.emit_tick(Ts::from_millis(0), Ts::from_nanos(0));
        assert_eq!(tick2.buy_volume.as_f64(), 0.0);
        assert_eq!(tick2.sell_volume.as_f64(), 0.0);
    }

    #[test]
    fn incremental_update_matches_by_price_not_position() {
        let mut norm = SymbolNormalizer::new(Symbol::new("BTCUSDT"));
        norm.apply_snapshot_update(&L2Update::new(
            Ts::from_nanos(1),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Px::new(100.0),
            Qty::new(5.0),
            0,
        ))
        .unwrap();
        norm.apply_snapshot_update(&L2Update::new(
            Ts::from_nanos(1),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Px::new(99.0),
            Qty::new(3.0),
            1,
        ))
        .unwrap();

        norm.apply_incremental_update(&L2Update::new(
            Ts::from_nanos(2),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Px::new(99.0),
            Qty::new(8.0),
            0,
        ))
        .unwrap();

        let book = norm.canonical_book();
        assert_eq!(book.bids[0].price.as_f64(), 100.0);
        assert_eq!(book.bids[0].size.as_f64(), 5.0);
        assert_eq!(book.bids[1].price.as_f64(), 99.0);
        assert_eq!(book.bids[1].size.as_f64(), 8.0);
    }

    #[test]
    fn reset_book_clears_prior_levels() {
        let mut norm = SymbolNormalizer::new(Symbol::new("ETHUSDT"));
        norm.apply_snapshot_update(&L2Update::new(
            Ts::from_nanos(1),
            Symbol::new("ETHUSDT"),
            Side::Bid,
            Px::new(10.0),
            Qty::new(1.0),
            0,
        ))
        .unwrap();
        norm.reset_book(Ts::from_nanos(2));
        let book = norm.canonical_book();
        assert!(book.best_bid().is_none());
    }
}
