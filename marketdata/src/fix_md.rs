//! FIX market-data decode (C7's FIX path, §4.6): `35=W`
//! (MarketDataSnapshotFullRefresh) and `35=X`
//! (MarketDataIncrementalRefresh), both keyed by the repeating group
//! `268/269/270/271` (`NoMDEntries`/`MDEntryType`/`MDEntryPx`/`MDEntrySize`),
//! with optional level index `1023|83|88`.

use common::{L2Update, Side, Symbol, Ts};
use fixp::{tags, FixMessage};
use thiserror::Error;

/// Errors raised decoding a FIX market-data message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixMdError {
    /// The message carried neither `35=W` nor `35=X`.
    #[error("not a market-data message")]
    NotMarketData,
    /// Required field (symbol) missing.
    #[error("missing symbol (tag 55)")]
    MissingSymbol,
}

/// Whether `msg` is a snapshot (`35=W`): snapshots replace the book,
/// incrementals merge into it.
#[must_use]
pub fn is_snapshot(msg: &FixMessage<'_>) -> bool {
    msg.is_msg_type(fixp::msg_type::MD_SNAPSHOT)
}

/// Decode the repeating `NoMDEntries` group of a `35=W`/`35=X` message into
/// a flat list of [`L2Update`]s. The raw tag=value stream doesn't carry
/// group boundaries explicitly; entries are recovered by scanning for
/// repeated `269` (MDEntryType) occurrences, each one starting a new
/// entry and consuming the nearest following `270`/`271`/level tags.
///
/// This walks the message's tag index directly rather than the
/// `HashMap`-backed single-value accessors, since a repeating group
/// reuses the same tag numbers across entries.
pub fn decode_md_entries(msg: &FixMessage<'_>, ts_local: Ts) -> Result<Vec<L2Update>, FixMdError> {
    if !msg.is_msg_type(fixp::msg_type::MD_SNAPSHOT) && !msg.is_msg_type(fixp::msg_type::MD_INCREMENTAL) {
        return Err(FixMdError::NotMarketData);
    }
    let symbol = msg.get_str(tags::SYMBOL).ok_or(FixMdError::MissingSymbol)?;
    let symbol = Symbol::new(symbol);

    let entries = raw_group_entries(msg.buffer());

    // Venues that omit the optional level index (1023) still need levels
    // assigned so distinct price points don't all collapse onto level 0;
    // §4.6: "levels are position-sorted (if the venue supplies a level
    // index) or price-sorted otherwise" -- bids descending, asks ascending.
    // This level is only meaningful to a snapshot's positional replay
    // (`OrderBook::apply`); an incremental is applied by price
    // (`OrderBook::apply_incremental`), which ignores it.
    let mut decoded: Vec<(Side, f64, f64, Option<u8>)> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let Some(entry_type) = entry.get(&tags::MD_ENTRY_TYPE).copied().map(|v| v as i64) else {
            continue;
        };
        let side = match entry_type {
            0 => Side::Bid,
            1 => Side::Ask,
            _ => continue,
        };
        let price = entry.get(&tags::MD_ENTRY_PX).copied().unwrap_or(0.0);
        let size = entry.get(&tags::MD_ENTRY_SIZE).copied().unwrap_or(0.0);
        let level = entry.get(&tags::MD_PRICE_LEVEL).copied().map(|v| v as u8);
        decoded.push((side, price, size, level));
    }

    let mut updates = Vec::with_capacity(decoded.len());
    for side in [Side::Bid, Side::Ask] {
        let mut same_side: Vec<usize> = decoded
            .iter()
            .enumerate()
            .filter(|(_, (s, ..))| *s == side)
            .map(|(i, _)| i)
            .collect();

        if same_side.iter().any(|&i| decoded[i].3.is_none()) {
            // Price-sort any entries lacking an explicit level: bids
            // descending, asks ascending.
            same_side.sort_by(|&a, &b| {
                let (pa, pb) = (decoded[a].1, decoded[b].1);
                match side {
                    Side::Bid => pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal),
                    Side::Ask => pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal),
                }
            });
        }

        for (position, &i) in same_side.iter().enumerate() {
            let (_, price, size, level) = decoded[i];
            let level = level.unwrap_or(position as u8);
            updates.push((i, L2Update::new(
                ts_local,
                symbol,
                side,
                common::Px::new(price),
                common::Qty::new(size),
                level,
            )));
        }
    }

    // Restore original decode order (bids/asks as they appeared on the
    // wire), which the existing tests and callers rely on.
    updates.sort_by_key(|(i, _)| *i);
    Ok(updates.into_iter().map(|(_, u)| u).collect())
}

/// One decoded `NoMDEntries` repeating-group entry: a small map from tag
/// to its numeric value, scoped to one `MDEntryType` occurrence.
type GroupEntry = std::collections::HashMap<u32, f64>;

/// Scan the raw tag=value stream (both `\x01` and `|` accepted) for
/// `MDEntryType` (269) occurrences; each occurrence starts a new group
/// entry that accumulates subsequent `270`/`271`/`1023` values until the
/// next `269` or end of buffer.
fn raw_group_entries(buf: &[u8]) -> Vec<GroupEntry> {
    let mut entries = Vec::new();
    let mut current: Option<GroupEntry> = None;
    let mut pos = 0usize;
    while pos < buf.len() {
        let Some(eq) = buf[pos..].iter().position(|&b| b == b'=') else {
            break;
        };
        let eq = pos + eq;
        let Some(tag) = std::str::from_utf8(&buf[pos..eq]).ok().and_then(|s| s.parse::<u32>().ok())
        else {
            break;
        };
        let value_start = eq + 1;
        let delim = buf[value_start..]
            .iter()
            .position(|&b| b == fixp::codec::SOH || b == b'|')
            .map(|i| value_start + i)
            .unwrap_or(buf.len());
        let value = &buf[value_start..delim];

        match tag {
            tags::MD_ENTRY_TYPE => {
                if let Some(prev) = current.take() {
                    entries.push(prev);
                }
                let mut map = GroupEntry::new();
                if let Some(v) = fixp::codec::fast_parse_f64(value) {
                    map.insert(tag, v);
                }
                current = Some(map);
            }
            tags::MD_ENTRY_PX | tags::MD_ENTRY_SIZE | tags::MD_PRICE_LEVEL => {
                if let Some(map) = current.as_mut() {
                    if let Some(v) = fixp::codec::fast_parse_f64(value) {
                        map.insert(tag, v);
                    }
                }
            }
            _ => {}
        }

        pos = delim + 1;
    }
    if let Some(last) = current {
        entries.push(last);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixp::FixBuilder;

    fn wire(msg_type: &str, symbol: &str, entries: &[(u8, f64, f64)]) -> Vec<u8> {
        let mut b = FixBuilder::new().field(tags::SYMBOL, symbol);
        for &(entry_type, price, size) in entries {
            b = b
                .int(tags::MD_ENTRY_TYPE, entry_type as i64)
                .decimal(tags::MD_ENTRY_PX, price, 2)
                .decimal(tags::MD_ENTRY_SIZE, size, 2);
        }
        b.build(msg_type, "SENDER", "TARGET", 1)
    }

    #[test]
    fn snapshot_decodes_bids_and_asks_e2e_3() {
        let wire = wire(
            fixp::msg_type::MD_SNAPSHOT,
            "BTCUSDT",
            &[(0, 100.0, 5.0), (0, 99.0, 3.0), (1, 101.0, 4.0), (1, 102.0, 2.0)],
        );
        let msg = FixMessage::parse(&wire).unwrap();
        assert!(is_snapshot(&msg));
        let updates = decode_md_entries(&msg, Ts::from_nanos(0)).unwrap();
        assert_eq!(updates.len(), 4);
        assert_eq!(updates[0].side, Side::Bid);
        assert_eq!(updates[0].price.as_f64(), 100.0);
        assert_eq!(updates[2].side, Side::Ask);
        assert_eq!(updates[2].price.as_f64(), 101.0);
    }

    #[test]
    fn incremental_is_not_a_snapshot() {
        let wire = wire(fixp::msg_type::MD_INCREMENTAL, "BTCUSDT", &[(0, 100.0, 7.0)]);
        let msg = FixMessage::parse(&wire).unwrap();
        assert!(!is_snapshot(&msg));
        let updates = decode_md_entries(&msg, Ts::from_nanos(0)).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].qty.as_f64(), 7.0);
    }

    #[test]
    fn incremental_update_to_non_best_level_is_matched_by_price_through_the_book() {
        use lob::OrderBook;

        let snapshot = wire(
            fixp::msg_type::MD_SNAPSHOT,
            "BTCUSDT",
            &[(0, 100.0, 5.0), (0, 99.0, 3.0)],
        );
        let snapshot_msg = FixMessage::parse(&snapshot).unwrap();
        let mut book = OrderBook::new(Symbol::new("BTCUSDT"));
        for update in decode_md_entries(&snapshot_msg, Ts::from_nanos(0)).unwrap() {
            book.apply(&update).unwrap();
        }
        assert_eq!(book.best_bid().unwrap().0.as_f64(), 100.0);

        // A partial incremental to the non-best bid level (99), no level
        // index on the wire.
        let incremental = wire(fixp::msg_type::MD_INCREMENTAL, "BTCUSDT", &[(0, 99.0, 8.0)]);
        let incremental_msg = FixMessage::parse(&incremental).unwrap();
        for update in decode_md_entries(&incremental_msg, Ts::from_nanos(1)).unwrap() {
            book.apply_incremental(&update).unwrap();
        }

        assert_eq!(book.best_bid().unwrap().0.as_f64(), 100.0);
        assert_eq!(book.best_bid().unwrap().1.as_f64(), 5.0);
        assert_eq!(book.bids.prices[1].as_f64(), 99.0);
        assert_eq!(book.bids.qtys[1].as_f64(), 8.0);
        assert_eq!(book.bids.depth, 2);
    }

    #[test]
    fn non_md_message_is_rejected() {
        let wire = FixBuilder::new().build(fixp::msg_type::HEARTBEAT, "SENDER", "TARGET", 1);
        let msg = FixMessage::parse(&wire).unwrap();
        assert_eq!(
            decode_md_entries(&msg, Ts::from_nanos(0)).unwrap_err(),
            FixMdError::NotMarketData
        );
    }
}
