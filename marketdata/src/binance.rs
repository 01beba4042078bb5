//! Binance-style JSON/WebSocket decode (C7's Binance path, §4.6, §6).
//!
//! URL patterns `/ws/<sym>@depth10@100ms`, `/ws/<sym>@bookTicker`,
//! `/ws/<sym>@trade`, and combined `/stream?streams=<a>/<b>/<c>`. Payloads
//! carry `b`/`a`/`B`/`A` (top-of-book), `bids`/`asks` (level arrays of
//! `[price,size]`), `p`/`q`/`m` (trade price/qty/buyer-is-maker).

use common::{L2Update, Side, Symbol, Ts};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised decoding a Binance-style payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BinanceError {
    /// `serde_json` failed to parse the payload at all.
    #[error("invalid json: {0}")]
    Json(String),
    /// A level's price/size string didn't parse as a number.
    #[error("unparseable level value: {0}")]
    BadLevel(String),
}

/// `depth10@100ms` partial-depth payload: up to [`lob::DEPTH`] levels per
/// side, `[price, size]` string pairs.
#[derive(Debug, Deserialize)]
pub struct DepthPayload {
    /// Venue event time, milliseconds, if present.
    #[serde(rename = "E", default)]
    pub event_time: u64,
    /// Bid levels, best first.
    #[serde(default)]
    pub bids: Vec<[String; 2]>,
    /// Ask levels, best first.
    #[serde(default)]
    pub asks: Vec<[String; 2]>,
}

/// `bookTicker` top-of-book-only payload.
#[derive(Debug, Deserialize)]
pub struct BookTickerPayload {
    #[serde(rename = "E", default)]
    event_time: u64,
    #[serde(rename = "b")]
    best_bid: String,
    #[serde(rename = "B")]
    best_bid_qty: String,
    #[serde(rename = "a")]
    best_ask: String,
    #[serde(rename = "A")]
    best_ask_qty: String,
}

/// `trade` payload: one executed trade, `m` true when the buyer was the
/// maker (i.e. the trade was seller-initiated / hit the bid).
#[derive(Debug, Deserialize)]
pub struct TradePayload {
    #[serde(rename = "E", default)]
    event_time: u64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    qty: String,
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

/// Parse a `depth` payload into up to `2 * lob::DEPTH` [`L2Update`]s for
/// `symbol`, one per level supplied.
pub fn decode_depth(symbol: Symbol, json: &str) -> Result<Vec<L2Update>, BinanceError> {
    let payload: DepthPayload = serde_json::from_str(json).map_err(|e| BinanceError::Json(e.to_string()))?;
    let ts = Ts::from_millis(payload.event_time);
    let mut updates = Vec::with_capacity(payload.bids.len() + payload.asks.len());
    for (level, [price, size]) in payload.bids.iter().take(lob::DEPTH).enumerate() {
        updates.push(level_update(ts, symbol, Side::Bid, price, size, level)?);
    }
    for (level, [price, size]) in payload.asks.iter().take(lob::DEPTH).enumerate() {
        updates.push(level_update(ts, symbol, Side::Ask, price, size, level)?);
    }
    Ok(updates)
}

/// Parse a `bookTicker` payload into a top-of-book-only pair of
/// [`L2Update`]s (level 0 on each side).
pub fn decode_book_ticker(symbol: Symbol, json: &str) -> Result<[L2Update; 2], BinanceError> {
    let payload: BookTickerPayload =
        serde_json::from_str(json).map_err(|e| BinanceError::Json(e.to_string()))?;
    let ts = Ts::from_millis(payload.event_time);
    let bid = level_update(ts, symbol, Side::Bid, &payload.best_bid, &payload.best_bid_qty, 0)?;
    let ask = level_update(ts, symbol, Side::Ask, &payload.best_ask, &payload.best_ask_qty, 0)?;
    Ok([bid, ask])
}

/// Decoded trade: aggressor side plus quantity, used by the normalizer to
/// update `buyVol`/`sellVol` (§4.6).
pub struct DecodedTrade {
    /// Venue timestamp.
    pub ts: Ts,
    /// Aggressor side: `Bid` when the trade lifted the offer (buyer
    /// aggressed), derived from `m` (`buyer_is_maker`).
    pub side: Side,
    /// Traded quantity.
    pub qty: common::Qty,
}

/// Parse a `trade` payload, mapping `m` (buyer-is-maker) to an aggressor
/// side: `m == true` means the buyer posted and the seller crossed, i.e.
/// the trade is seller-aggressed (`Side::Ask`); `m == false` is
/// buyer-aggressed (`Side::Bid`).
pub fn decode_trade(json: &str) -> Result<DecodedTrade, BinanceError> {
    let payload: TradePayload = serde_json::from_str(json).map_err(|e| BinanceError::Json(e.to_string()))?;
    let qty: f64 = payload
        .qty
        .parse()
        .map_err(|_| BinanceError::BadLevel(payload.qty.clone()))?;
    let _: f64 = payload
        .price
        .parse()
        .map_err(|_| BinanceError::BadLevel(payload.price.clone()))?;
    let side = if payload.buyer_is_maker { Side::Ask } else { Side::Bid };
    Ok(DecodedTrade {
        ts: Ts::from_millis(payload.event_time),
        side,
        qty: common::Qty::new(qty),
    })
}

fn level_update(
    ts: Ts,
    symbol: Symbol,
    side: Side,
    price: &str,
    size: &str,
    level: usize,
) -> Result<L2Update, BinanceError> {
    let price: f64 = price.parse().map_err(|_| BinanceError::BadLevel(price.to_string()))?;
    let size: f64 = size.parse().map_err(|_| BinanceError::BadLevel(size.to_string()))?;
    Ok(L2Update::new(
        ts,
        symbol,
        side,
        common::Px::new(price),
        common::Qty::new(size),
        level.min(u8::MAX as usize) as u8,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_payload_decodes_both_sides() {
        let json = r#"{"E":1690000000000,"bids":[["100.00","5.0"],["99.50","3.0"]],"asks":[["101.00","4.0"]]}"#;
        let updates = decode_depth(Symbol::new("BTCUSDT"), json).unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].side, Side::Bid);
        assert_eq!(updates[0].price.as_f64(), 100.0);
        assert_eq!(updates[2].side, Side::Ask);
    }

    #[test]
    fn book_ticker_decodes_top_of_book_only() {
        let json = r#"{"E":1,"b":"100.0","B":"2.0","a":"101.0","A":"3.0"}"#;
        let [bid, ask] = decode_book_ticker(Symbol::new("ETHUSDT"), json).unwrap();
        assert_eq!(bid.price.as_f64(), 100.0);
        assert_eq!(ask.price.as_f64(), 101.0);
    }

    #[test]
    fn trade_maps_buyer_is_maker_to_aggressor_side() {
        let json = r#"{"E":5,"p":"50.0","q":"1.5","m":true}"#;
        let trade = decode_trade(json).unwrap();
        assert_eq!(trade.side, Side::Ask);
        assert_eq!(trade.qty.as_f64(), 1.5);

        let json2 = r#"{"E":5,"p":"50.0","q":"1.5","m":false}"#;
        let trade2 = decode_trade(json2).unwrap();
        assert_eq!(trade2.side, Side::Bid);
    }

    #[test]
    fn bad_json_is_reported() {
        let err = decode_depth(Symbol::new("BTCUSDT"), "not json").unwrap_err();
        assert!(matches!(err, BinanceError::Json(_)));
    }
}
