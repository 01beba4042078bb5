//! Order construction (§4.9): client-order-id generation and wire encoding
//! of NewOrderSingle (35=D) / OrderCancelRequest (35=F).

use common::{ClientOrderIdGen, Px, Qty, Side, Symbol};
use fixp::codec::FixBuilder;

/// `40=OrdType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    /// `40=1`.
    Market,
    /// `40=2`.
    Limit,
}

impl OrderType {
    fn fix_tag(self) -> &'static str {
        match self {
            Self::Market => "1",
            Self::Limit => "2",
        }
    }
}

/// `59=TimeInForce`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    /// `59=0`.
    Day,
    /// `59=1`.
    Gtc,
    /// `59=3`.
    Ioc,
    /// `59=4`.
    Fok,
}

impl TimeInForce {
    fn fix_tag(self) -> &'static str {
        match self {
            Self::Day => "0",
            Self::Gtc => "1",
            Self::Ioc => "3",
            Self::Fok => "4",
        }
    }
}

fn side_tag(side: Side) -> &'static str {
    match side {
        Side::Bid => "1",
        Side::Ask => "2",
    }
}

/// Builds NewOrder/Cancel wire frames and mints client-order-ids. One
/// instance per FIX session (sender/target comp ids are fixed per session).
pub struct OrderRouter {
    id_gen: ClientOrderIdGen,
    sender_comp_id: String,
    target_comp_id: String,
}

impl OrderRouter {
    /// Construct a router for one session, tagging generated client-order
    /// ids with `cl_ord_prefix`.
    #[must_use]
    pub fn new(sender_comp_id: impl Into<String>, target_comp_id: impl Into<String>, cl_ord_prefix: &'static str) -> Self {
        Self {
            id_gen: ClientOrderIdGen::new(cl_ord_prefix),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
        }
    }

    /// Generate a client-order-id and encode a NewOrderSingle (35=D).
    /// Price is only encoded for `OrderType::Limit`. `seq` is the session's
    /// next outbound sequence number.
    #[must_use]
    pub fn new_order(
        &self,
        symbol: Symbol,
        side: Side,
        qty: Qty,
        order_type: OrderType,
        price: Px,
        tif: TimeInForce,
        now_ms: u64,
        seq: u64,
    ) -> (String, Vec<u8>) {
        let cl_ord_id = self.id_gen.next(now_ms);
        let mut builder = FixBuilder::new()
            .field(11, cl_ord_id.clone())
            .field(55, symbol.as_str())
            .field(54, side_tag(side))
            .decimal(38, qty.as_f64(), 8)
            .field(40, order_type.fix_tag())
            .field(59, tif.fix_tag());
        if order_type == OrderType::Limit {
            builder = builder.decimal(44, price.as_f64(), 8);
        }
        let wire = builder.build("D", &self.sender_comp_id, &self.target_comp_id, seq);
        (cl_ord_id, wire)
    }

    /// Encode an OrderCancelRequest (35=F) against an existing client
    /// order. `new_cl_ord_id` is minted fresh; `orig_cl_ord_id` (tag 41)
    /// references the order being canceled.
    #[must_use]
    pub fn cancel(
        &self,
        orig_cl_ord_id: &str,
        symbol: Symbol,
        side: Side,
        now_ms: u64,
        seq: u64,
    ) -> (String, Vec<u8>) {
        let cl_ord_id = self.id_gen.next(now_ms);
        let wire = FixBuilder::new()
            .field(11, cl_ord_id.clone())
            .field(41, orig_cl_ord_id)
            .field(55, symbol.as_str())
            .field(54, side_tag(side))
            .build("F", &self.sender_comp_id, &self.target_comp_id, seq);
        (cl_ord_id, wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixp::codec::FixMessage;

    #[test]
    fn new_order_encodes_limit_order_fields() {
        let router = OrderRouter::new("US", "VENUE", "OR");
        let (cl_ord_id, wire) = router.new_order(
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Qty::new(2.5),
            OrderType::Limit,
            Px::new(50_000.0),
            TimeInForce::Gtc,
            1_000,
            1,
        );

        let msg = FixMessage::parse(&wire).unwrap();
        assert!(msg.is_msg_type("D"));
        assert_eq!(msg.get_str(11), Some(cl_ord_id.as_str()));
        assert_eq!(msg.get_str(55), Some("BTCUSDT"));
        assert_eq!(msg.get_str(54), Some("1"));
        assert_eq!(msg.get_f64_fast(38), Some(2.5));
        assert_eq!(msg.get_str(40), Some("2"));
        assert_eq!(msg.get_f64_fast(44), Some(50_000.0));
        assert_eq!(msg.get_str(59), Some("1"));
    }

    #[test]
    fn new_order_omits_price_for_market_orders() {
        let router = OrderRouter::new("US", "VENUE", "OR");
        let (_, wire) = router.new_order(
            Symbol::new("ETHUSDT"),
            Side::Ask,
            Qty::new(1.0),
            OrderType::Market,
            Px::zero(),
            TimeInForce::Ioc,
            0,
            1,
        );
        let msg = FixMessage::parse(&wire).unwrap();
        assert!(!msg.has_field(44));
    }

    #[test]
    fn cancel_references_the_original_client_order_id() {
        let router = OrderRouter::new("US", "VENUE", "OR");
        let (_, wire) = router.cancel("OR1_0", Symbol::new("BTCUSDT"), Side::Bid, 500, 2);
        let msg = FixMessage::parse(&wire).unwrap();
        assert!(msg.is_msg_type("F"));
        assert_eq!(msg.get_str(41), Some("OR1_0"));
    }

    #[test]
    fn successive_client_order_ids_are_unique() {
        let router = OrderRouter::new("US", "VENUE", "OR");
        let (a, _) = router.new_order(
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Qty::new(1.0),
            OrderType::Market,
            Px::zero(),
            TimeInForce::Ioc,
            1_000,
            1,
        );
        let (b, _) = router.new_order(
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Qty::new(1.0),
            OrderType::Market,
            Px::zero(),
            TimeInForce::Ioc,
            1_000,
            2,
        );
        assert_ne!(a, b);
    }
}
