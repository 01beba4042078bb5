//! Canonical order-book reconstruction from normalized [`L2Update`]s (C7's
//! order-book half).

use crate::price_levels::{SideBook, DEPTH};
use common::{CanonicalBook, L2Update, PriceLevel, Px, Qty, Side, Symbol, Ts};

/// Full order book for a single symbol, rebuilt incrementally by applying
/// [`L2Update`]s. Independent of which venue produced the update (§4.6).
#[derive(Clone, Debug)]
pub struct OrderBook {
    /// Symbol this book represents.
    pub symbol: Symbol,
    /// Timestamp of the last applied update.
    pub ts: Ts,
    /// Bid side (buyers), descending by price.
    pub bids: SideBook,
    /// Ask side (sellers), ascending by price.
    pub asks: SideBook,
    /// Monotonically increasing count of applied updates.
    pub sequence: u64,
}

impl OrderBook {
    /// Create a new empty order book.
    #[inline]
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            ts: Ts::from_nanos(0),
            bids: SideBook::new(),
            asks: SideBook::new(),
            sequence: 0,
        }
    }

    /// Apply a full-refresh (snapshot) L2 update to the book by position:
    /// the caller has already rebuilt the book from empty via
    /// [`Self::clear`], so each entry's level index is its rank within the
    /// snapshot (§4.6). Hot path: allocation-free.
    #[inline]
    pub fn apply(&mut self, update: &L2Update) -> Result<(), BookError> {
        if update.level as usize >= DEPTH {
            return Err(BookError::InvalidLevel {
                level: update.level as usize,
            });
        }

        let side = match update.side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        side.set(update.level as usize, update.price, update.qty);

        self.finish_apply(update.ts)
    }

    /// Apply an incremental (`35=X`) L2 update to the book by matching
    /// `update.price` against the levels already held, rather than by
    /// position (§4.6: incrementals update/insert/remove by price level).
    /// Hot path: allocation-free.
    #[inline]
    pub fn apply_incremental(&mut self, update: &L2Update) -> Result<(), BookError> {
        let (side, ascending) = match update.side {
            Side::Bid => (&mut self.bids, false),
            Side::Ask => (&mut self.asks, true),
        };
        side.apply_incremental(update.price, update.qty, ascending);

        self.finish_apply(update.ts)
    }

    /// Shared tail of both apply paths: bump the timestamp/sequence and
    /// enforce the crossed-book invariant (I4).
    #[inline]
    fn finish_apply(&mut self, ts: Ts) -> Result<(), BookError> {
        self.ts = ts;
        self.sequence += 1;

        if self.is_crossed() {
            return Err(BookError::CrossedBook {
                bid: self.bids.best().map(|(p, _)| p),
                ask: self.asks.best().map(|(p, _)| p),
            });
        }

        Ok(())
    }

    /// Best bid price and size.
    #[inline]
    #[must_use]
    pub fn best_bid(&self) -> Option<(Px, Qty)> {
        self.bids.best()
    }

    /// Best ask price and size.
    #[inline]
    #[must_use]
    pub fn best_ask(&self) -> Option<(Px, Qty)> {
        self.asks.best()
    }

    /// Mid price (average of best bid and ask), in tick-scaled arithmetic.
    #[inline]
    #[must_use]
    pub fn mid(&self) -> Option<Px> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => {
                let mid_ticks = (bid.as_ticks() + ask.as_ticks()) / 2;
                Some(Px::from_ticks(mid_ticks))
            }
            _ => None,
        }
    }

    /// Microprice: size-weighted mid of best bid/ask.
    #[inline]
    #[must_use]
    pub fn microprice(&self) -> Option<Px> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid_px, bid_qty)), Some((ask_px, ask_qty))) => {
                let bid_val = bid_px.as_ticks() as f64 * ask_qty.as_f64();
                let ask_val = ask_px.as_ticks() as f64 * bid_qty.as_f64();
                let total_qty = bid_qty.as_f64() + ask_qty.as_f64();
                if total_qty > 0.0 {
                    let micro_ticks = ((bid_val + ask_val) / total_qty).round() as i64;
                    Some(Px::from_ticks(micro_ticks))
                } else {
                    self.mid()
                }
            }
            _ => None,
        }
    }

    /// Spread in integer ticks.
    #[inline]
    #[must_use]
    pub fn spread_ticks(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask.as_ticks() - bid.as_ticks()),
            _ => None,
        }
    }

    /// Order-book imbalance over the top `depth` levels of each side, in
    /// `[-1.0, 1.0]`: `-1` all ask, `1` all bid.
    #[inline]
    #[must_use]
    pub fn imbalance(&self, depth: usize) -> Option<f64> {
        let bid_qty = self.bids.total_qty(depth).as_f64();
        let ask_qty = self.asks.total_qty(depth).as_f64();
        let total = bid_qty + ask_qty;
        if total > 0.0 {
            Some((bid_qty - ask_qty) / total)
        } else {
            None
        }
    }

    /// Whether the book is crossed: `bid[0] >= ask[0]` (I4 fault signal).
    #[inline]
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid >= ask,
            _ => false,
        }
    }

    /// Whether the book is locked: `bid[0] == ask[0]`.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid == ask,
            _ => false,
        }
    }

    /// Reset the book to empty.
    #[inline]
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.sequence = 0;
    }

    /// Snapshot this book into the canonical top-`N` representation shared
    /// across the pipeline.
    #[inline]
    #[must_use]
    pub fn to_canonical(&self) -> CanonicalBook {
        let mut book = CanonicalBook::empty(self.symbol);
        for i in 0..DEPTH.min(self.bids.depth) {
            book.bids[i] = PriceLevel {
                price: self.bids.prices[i],
                size: self.bids.qtys[i],
            };
        }
        for i in 0..DEPTH.min(self.asks.depth) {
            book.asks[i] = PriceLevel {
                price: self.asks.prices[i],
                size: self.asks.qtys[i],
            };
        }
        book.ts_local = self.ts;
        book
    }

    /// Deterministic hash of the book's level state, used by property
    /// tests (R3) in place of a full struct comparison.
    #[inline]
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hash = 0u64;
        for i in 0..self.bids.depth.min(DEPTH) {
            hash = hash
                .wrapping_mul(31)
                .wrapping_add(self.bids.prices[i].as_ticks() as u64);
            hash = hash
                .wrapping_mul(31)
                .wrapping_add(self.bids.qtys[i].as_ticks() as u64);
        }
        for i in 0..self.asks.depth.min(DEPTH) {
            hash = hash
                .wrapping_mul(31)
                .wrapping_add(self.asks.prices[i].as_ticks() as u64);
            hash = hash
                .wrapping_mul(31)
                .wrapping_add(self.asks.qtys[i].as_ticks() as u64);
        }
        hash
    }
}

trait QtyTicks {
    fn as_ticks(&self) -> i64;
}

impl QtyTicks for Qty {
    fn as_ticks(&self) -> i64 {
        (self.as_f64() * common::types::TICK_SCALE) as i64
    }
}

/// Errors raised while applying updates to an [`OrderBook`].
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// Applying the update would cross the book.
    #[error("crossed book: bid={bid:?} >= ask={ask:?}")]
    CrossedBook {
        /// Best bid that would cross.
        bid: Option<Px>,
        /// Best ask that would cross.
        ask: Option<Px>,
    },

    /// The update named a level beyond [`DEPTH`].
    #[error("invalid level: {level} >= {}", DEPTH)]
    InvalidLevel {
        /// The offending level index.
        level: usize,
    },
}
