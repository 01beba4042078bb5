//! Order router & OMS FSM (C10): client-order-id generation, NewOrder/
//! Cancel wire construction, and the order state machine driven by
//! ExecutionReports.

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod error;
pub mod fsm;
pub mod router;

pub use audit::{AuditEntry, AuditRing};
pub use error::OmsError;
pub use fsm::{OmsFsm, OrderEvent};
pub use router::{OrderRouter, OrderType, TimeInForce};
