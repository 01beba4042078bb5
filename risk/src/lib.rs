//! Risk / execution supervisor (C9): cooldown, token-bucket rate limit,
//! per-symbol and global exposure caps, drawdown and daily-loss kill,
//! gating every order intent before it reaches the router.

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod limits;
pub mod pnl;
pub mod position;
pub mod supervisor;
pub mod token_bucket;

pub use limits::RiskLimits;
pub use pnl::PnlTracker;
pub use position::{PositionSnapshot, PositionTracker};
pub use supervisor::{Intent, RiskDecision, RiskError, Supervisor};
pub use token_bucket::TokenBucket;
