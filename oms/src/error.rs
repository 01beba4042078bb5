//! OMS error types (C10).

use thiserror::Error;

/// Errors raised while routing orders or applying ExecutionReports.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OmsError {
    /// An ExecutionReport referenced a `ClOrdID` the FSM has no record of
    /// (§7 "OMS inconsistency"). Logged and discarded, never synthesized.
    #[error("execution report for unknown clOrdId {0}")]
    UnknownClOrdId(String),

    /// The record is already in a terminal state (`Filled`/`Canceled`/
    /// `Rejected`); further transitions are ignored, not an error the
    /// caller needs to act on, but surfaced so callers can log it.
    #[error("order {0} is already terminal")]
    AlreadyTerminal(String),

    /// The incoming report carried a combination of `ExecType`/`OrdStatus`
    /// the FSM doesn't recognize.
    #[error("unrecognized execution report: ExecType={exec_type:?} OrdStatus={ord_status:?}")]
    UnrecognizedReport {
        /// Raw `150=` tag value, if present.
        exec_type: Option<String>,
        /// Raw `39=` tag value, if present.
        ord_status: Option<String>,
    },
}
