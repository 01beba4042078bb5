//! Order FSM (§4.9): tracks `OrderRecord`s by client-order-id, driven
//! exclusively by inbound ExecutionReports (35=8). Single writer per the
//! §5 ordering guarantee ("ExecutionReports delivered to the OMS FSM are
//! serialized per client-order-id").

use std::collections::{HashMap, HashSet};

use common::{OrderRecord, OrderState, Px, Qty, Ts};
use fixp::codec::FixMessage;

use crate::audit::{AuditEntry, AuditRing};
use crate::error::OmsError;

/// A state transition the FSM applied, handed to the audit ring and to the
/// engine supervisor for downstream fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    /// Client order id the event concerns.
    pub cl_ord_id: String,
    /// State before the transition.
    pub from: OrderState,
    /// State after the transition.
    pub to: OrderState,
}

/// Owns every live `OrderRecord`, keyed by client-order-id. Dedups
/// ExecutionReports by `ExecID` (tag 17) per R2: replaying the same report
/// must not advance state twice.
#[derive(Default)]
pub struct OmsFsm {
    orders: HashMap<String, OrderRecord>,
    seen_exec_ids: HashSet<String>,
    audit: AuditRing,
}

impl OmsFsm {
    /// Construct an empty FSM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted order in `PendingNew`, as done
    /// immediately after a risk approval and successful send (§4.9).
    pub fn submit(&mut self, record: OrderRecord) {
        self.orders.insert(record.cl_ord_id.clone(), record);
    }

    /// Current record for `cl_ord_id`, if tracked.
    #[must_use]
    pub fn get(&self, cl_ord_id: &str) -> Option<&OrderRecord> {
        self.orders.get(cl_ord_id)
    }

    /// Number of records still tracked (terminal records are GC'd on
    /// transition, per §4.9 "terminal states free the record for GC").
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether no orders are currently tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// The bounded audit trail of transitions this FSM has applied.
    #[must_use]
    pub fn audit(&self) -> &AuditRing {
        &self.audit
    }

    /// Apply an inbound ExecutionReport (35=8). Returns `Ok(None)` for a
    /// duplicate (already-seen `ExecID`, R2) or an unrecognized
    /// `ExecType`/`OrdStatus` pair that the FSM logs and discards rather
    /// than treats as an error worth propagating. Returns `Err` only for
    /// conditions the caller should act on (unknown `ClOrdID`).
    pub fn apply_exec_report(&mut self, msg: &FixMessage<'_>, now: Ts) -> Result<Option<OrderEvent>, OmsError> {
        let cl_ord_id = msg
            .get_str(11)
            .ok_or_else(|| OmsError::UnknownClOrdId(String::new()))?
            .to_string();

        if let Some(exec_id) = msg.get_str(17) {
            if !self.seen_exec_ids.insert(exec_id.to_string()) {
                return Ok(None);
            }
        }

        let exec_type = msg.get_str(150);
        let ord_status = msg.get_str(39);

        let record = self
            .orders
            .get_mut(&cl_ord_id)
            .ok_or_else(|| OmsError::UnknownClOrdId(cl_ord_id.clone()))?;

        if record.state.is_terminal() {
            return Err(OmsError::AlreadyTerminal(cl_ord_id));
        }

        let from = record.state;
        let to = match (exec_type, ord_status) {
            (Some("0"), Some("0")) => OrderState::New,
            (Some("4"), _) | (_, Some("4")) => OrderState::Canceled,
            (Some("8"), _) | (_, Some("8")) => OrderState::Rejected,
            (Some("F"), _) | (_, Some("1")) | (_, Some("2")) => {
                if let Some(last_qty) = msg.get_f64_fast(32) {
                    record.filled = Qty::new((record.filled.as_f64() + last_qty).min(record.qty.as_f64()));
                }
                if let Some(last_px) = msg.get_f64_fast(31) {
                    record.price = Px::new(last_px);
                }
                if record.filled.as_f64() >= record.qty.as_f64() {
                    OrderState::Filled
                } else {
                    OrderState::PartiallyFilled
                }
            }
            _ => {
                tracing::warn!(
                    cl_ord_id = %cl_ord_id,
                    exec_type = ?exec_type,
                    ord_status = ?ord_status,
                    "discarding unrecognized execution report"
                );
                return Err(OmsError::UnrecognizedReport {
                    exec_type: exec_type.map(str::to_string),
                    ord_status: ord_status.map(str::to_string),
                })
            }
        };

        record.state = to;
        record.last_update_ts = now;
        if let Some(venue_id) = msg.get_str(37) {
            record.venue_order_id = Some(venue_id.to_string());
        }

        if to.is_terminal() {
            self.orders.remove(&cl_ord_id);
        }

        self.audit.record(AuditEntry { ts: now, cl_ord_id: cl_ord_id.clone(), from, to });
        Ok(Some(OrderEvent { cl_ord_id, from, to }))
    }

    /// Mark `cl_ord_id` as `PendingCancel` ahead of sending an
    /// OrderCancelRequest. No-op (returns `Err`) if the order is unknown or
    /// already terminal. Remembers the prior state so a cancel reject can
    /// revert to it (§4.9).
    pub fn mark_pending_cancel(&mut self, cl_ord_id: &str, now: Ts) -> Result<(), OmsError> {
        let record = self
            .orders
            .get_mut(cl_ord_id)
            .ok_or_else(|| OmsError::UnknownClOrdId(cl_ord_id.to_string()))?;
        if record.state.is_terminal() {
            return Err(OmsError::AlreadyTerminal(cl_ord_id.to_string()));
        }
        record.prior_state = Some(record.state);
        record.state = OrderState::PendingCancel;
        record.last_update_ts = now;
        Ok(())
    }

    /// Apply an inbound OrderCancelReject (35=9): revert `PendingCancel`
    /// back to the state it was in before the cancel request (§4.9
    /// "reject to cancel reverts to prior state"). A reject for an order
    /// not currently `PendingCancel` is logged and discarded.
    pub fn apply_cancel_reject(&mut self, msg: &FixMessage<'_>, now: Ts) -> Result<Option<OrderEvent>, OmsError> {
        let cl_ord_id = msg
            .get_str(11)
            .ok_or_else(|| OmsError::UnknownClOrdId(String::new()))?
            .to_string();
        let record = self
            .orders
            .get_mut(&cl_ord_id)
            .ok_or_else(|| OmsError::UnknownClOrdId(cl_ord_id.clone()))?;

        let Some(prior) = record.prior_state.take() else {
            tracing::warn!(cl_ord_id = %cl_ord_id, "cancel reject for order not pending cancel");
            return Ok(None);
        };

        let from = record.state;
        record.state = prior;
        record.last_update_ts = now;
        self.audit.record(AuditEntry { ts: now, cl_ord_id: cl_ord_id.clone(), from, to: prior });
        Ok(Some(OrderEvent { cl_ord_id, from, to: prior }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Symbol;
    use fixp::codec::FixBuilder;

    fn new_pending(cl_ord_id: &str) -> OrderRecord {
        OrderRecord::new_pending(
            cl_ord_id.to_string(),
            Symbol::new("BTCUSDT"),
            common::Side::Bid,
            Qty::new(10.0),
            Px::new(100.0),
            Ts::from_millis(0),
        )
    }

    fn exec_report(cl_ord_id: &str, exec_id: &str, exec_type: &str, ord_status: &str) -> Vec<u8> {
        FixBuilder::new()
            .field(11, cl_ord_id)
            .field(17, exec_id)
            .field(150, exec_type)
            .field(39, ord_status)
            .build("8", "VENUE", "US", 1)
    }

    #[test]
    fn new_ack_transitions_pending_new_to_new() {
        let mut fsm = OmsFsm::new();
        fsm.submit(new_pending("OR1_0"));
        let wire = exec_report("OR1_0", "E1", "0", "0");
        let msg = FixMessage::parse(&wire).unwrap();
        let event = fsm.apply_exec_report(&msg, Ts::from_millis(1)).unwrap().unwrap();
        assert_eq!(event.from, OrderState::PendingNew);
        assert_eq!(event.to, OrderState::New);
    }

    #[test]
    fn partial_fill_then_full_fill_transitions_correctly() {
        let mut fsm = OmsFsm::new();
        fsm.submit(new_pending("OR1_0"));

        let wire1 = FixBuilder::new()
            .field(11, "OR1_0")
            .field(17, "E1")
            .field(150, "F")
            .field(39, "1")
            .decimal(32, 4.0, 2)
            .decimal(31, 100.0, 2)
            .build("8", "VENUE", "US", 1);
        let msg1 = FixMessage::parse(&wire1).unwrap();
        let event1 = fsm.apply_exec_report(&msg1, Ts::from_millis(1)).unwrap().unwrap();
        assert_eq!(event1.to, OrderState::PartiallyFilled);

        let wire2 = FixBuilder::new()
            .field(11, "OR1_0")
            .field(17, "E2")
            .field(150, "F")
            .field(39, "2")
            .decimal(32, 6.0, 2)
            .decimal(31, 101.0, 2)
            .build("8", "VENUE", "US", 2);
        let msg2 = FixMessage::parse(&wire2).unwrap();
        let event2 = fsm.apply_exec_report(&msg2, Ts::from_millis(2)).unwrap().unwrap();
        assert_eq!(event2.to, OrderState::Filled);
        assert!(fsm.get("OR1_0").is_none(), "terminal record must be GC'd");
    }

    #[test]
    fn duplicate_exec_id_is_ignored_r2() {
        let mut fsm = OmsFsm::new();
        fsm.submit(new_pending("OR1_0"));
        let wire = exec_report("OR1_0", "E1", "0", "0");
        let msg = FixMessage::parse(&wire).unwrap();
        let first = fsm.apply_exec_report(&msg, Ts::from_millis(1)).unwrap();
        assert!(first.is_some());
        let second = fsm.apply_exec_report(&msg, Ts::from_millis(2)).unwrap();
        assert_eq!(second, None);
        assert_eq!(fsm.get("OR1_0").unwrap().state, OrderState::New);
    }

    #[test]
    fn unknown_cl_ord_id_is_an_error() {
        let mut fsm = OmsFsm::new();
        let wire = exec_report("GHOST", "E1", "0", "0");
        let msg = FixMessage::parse(&wire).unwrap();
        let err = fsm.apply_exec_report(&msg, Ts::from_millis(1)).unwrap_err();
        assert_eq!(err, OmsError::UnknownClOrdId("GHOST".to_string()));
    }

    #[test]
    fn cancel_reject_reverts_to_prior_state() {
        let mut fsm = OmsFsm::new();
        fsm.submit(new_pending("OR1_0"));
        let wire = exec_report("OR1_0", "E1", "0", "0");
        let msg = FixMessage::parse(&wire).unwrap();
        fsm.apply_exec_report(&msg, Ts::from_millis(1)).unwrap();
        assert_eq!(fsm.get("OR1_0").unwrap().state, OrderState::New);

        fsm.mark_pending_cancel("OR1_0", Ts::from_millis(2)).unwrap();
        assert_eq!(fsm.get("OR1_0").unwrap().state, OrderState::PendingCancel);

        let reject_wire = FixBuilder::new().field(11, "OR1_0").build("9", "VENUE", "US", 2);
        let reject_msg = FixMessage::parse(&reject_wire).unwrap();
        let event = fsm.apply_cancel_reject(&reject_msg, Ts::from_millis(3)).unwrap().unwrap();
        assert_eq!(event.from, OrderState::PendingCancel);
        assert_eq!(event.to, OrderState::New);
        assert_eq!(fsm.get("OR1_0").unwrap().state, OrderState::New);
    }

    #[test]
    fn audit_ring_records_applied_transitions() {
        let mut fsm = OmsFsm::new();
        fsm.submit(new_pending("OR1_0"));
        let wire = exec_report("OR1_0", "E1", "0", "0");
        let msg = FixMessage::parse(&wire).unwrap();
        fsm.apply_exec_report(&msg, Ts::from_millis(1)).unwrap();

        fsm.mark_pending_cancel("OR1_0", Ts::from_millis(2)).unwrap();
        let reject_wire = FixBuilder::new().field(11, "OR1_0").build("9", "VENUE", "US", 2);
        let reject_msg = FixMessage::parse(&reject_wire).unwrap();
        fsm.apply_cancel_reject(&reject_msg, Ts::from_millis(3)).unwrap();

        let recorded: Vec<_> = fsm.audit().iter().map(|e| (e.from, e.to)).collect();
        assert_eq!(
            recorded,
            vec![
                (OrderState::PendingNew, OrderState::New),
                (OrderState::PendingCancel, OrderState::New),
            ]
        );
    }

    #[test]
    fn rejected_report_transitions_to_rejected_and_gcs() {
        let mut fsm = OmsFsm::new();
        fsm.submit(new_pending("OR1_0"));
        let wire = exec_report("OR1_0", "E1", "8", "8");
        let msg = FixMessage::parse(&wire).unwrap();
        let event = fsm.apply_exec_report(&msg, Ts::from_millis(1)).unwrap().unwrap();
        assert_eq!(event.to, OrderState::Rejected);
        assert!(fsm.is_empty());
    }
}
