//! Shared error type for cross-crate boundaries that don't warrant their own
//! `thiserror` enum (most components define a narrower one instead; see
//! `fixp::SessionError`, `lob::BookError`, `risk::RiskError`, `oms::OmsError`).

use thiserror::Error;

/// Errors that can cross a `common`-level boundary (e.g. clock/type
/// validation shared by multiple crates).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A symbol string didn't fit the fixed-width identifier.
    #[error("symbol '{0}' is not valid")]
    InvalidSymbol(String),

    /// A numeric field was outside its expected domain (e.g. negative
    /// quantity).
    #[error("invalid numeric value for {field}: {value}")]
    InvalidValue {
        /// Name of the field that failed validation.
        field: &'static str,
        /// String rendering of the offending value.
        value: String,
    },
}
