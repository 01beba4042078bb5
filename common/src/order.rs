//! OMS order record and its finite state machine states (§3 `OrderRecord`,
//! §4.9).

pub use crate::market::Side;
use crate::types::{Px, Qty, Ts};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an [`OrderRecord`], driven by ExecutionReports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Submitted, no acknowledgement yet.
    PendingNew,
    /// Acknowledged live at the venue.
    New,
    /// Partially filled; `filled < qty`.
    PartiallyFilled,
    /// Fully filled; `filled == qty`. Terminal.
    Filled,
    /// Cancel request sent, awaiting venue response.
    PendingCancel,
    /// Canceled by venue or operator. Terminal.
    Canceled,
    /// Rejected by venue. Terminal.
    Rejected,
}

impl OrderState {
    /// Whether this state is terminal (the record may be garbage
    /// collected once in this state).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

/// A single order's OMS-owned record. Created on submit, mutated only by
/// the OMS FSM as ExecutionReports arrive; every other component sees a
/// copied snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Client-assigned order id (opaque, monotonic per `ClientOrderIdGen`).
    pub cl_ord_id: String,
    /// Venue-assigned order id, populated after the first acknowledgement.
    pub venue_order_id: Option<String>,
    /// Instrument.
    pub symbol: crate::types::Symbol,
    /// Order side.
    pub side: Side,
    /// Original order quantity.
    pub qty: Qty,
    /// Cumulative filled quantity.
    pub filled: Qty,
    /// Limit price (meaningless for market orders, kept for Limit/TIF use).
    pub price: Px,
    /// Current FSM state.
    pub state: OrderState,
    /// State held immediately before entering `PendingCancel`, so a
    /// cancel reject (OrderCancelReject, 35=9) can revert to it (§4.9:
    /// "reject to cancel reverts to prior state"). `None` outside
    /// `PendingCancel`.
    pub prior_state: Option<OrderState>,
    /// Timestamp of the last state transition.
    pub last_update_ts: Ts,
}

impl OrderRecord {
    /// Construct a freshly submitted record in `PendingNew`.
    #[must_use]
    pub fn new_pending(
        cl_ord_id: String,
        symbol: crate::types::Symbol,
        side: Side,
        qty: Qty,
        price: Px,
        now: Ts,
    ) -> Self {
        Self {
            cl_ord_id,
            venue_order_id: None,
            symbol,
            side,
            qty,
            filled: Qty::zero(),
            price,
            state: OrderState::PendingNew,
            prior_state: None,
            last_update_ts: now,
        }
    }

    /// Remaining unfilled quantity: `qty - filled` (I3).
    #[must_use]
    pub fn leaves(&self) -> Qty {
        Qty::new((self.qty.as_f64() - self.filled.as_f64()).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    #[test]
    fn new_record_starts_pending_with_full_leaves() {
        let rec = OrderRecord::new_pending(
            "OR1_0".into(),
            Symbol::new("BTCUSDT"),
            Side::Bid,
            Qty::new(10.0),
            Px::new(50.0),
            Ts::from_millis(0),
        );
        assert_eq!(rec.state, OrderState::PendingNew);
        assert_eq!(rec.leaves().as_f64(), 10.0);
        assert!(!rec.state.is_terminal());
    }

    #[test]
    fn terminal_states_are_recognized() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Canceled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(!OrderState::PartiallyFilled.is_terminal());
    }
}
