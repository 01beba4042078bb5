//! Risk / execution supervisor (C9, §4.8): evaluates the eight gates in
//! order, first failure short-circuits, and trips a sticky kill-switch on
//! a drawdown or daily-loss breach.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use common::{Px, Qty, Side, Symbol};
use thiserror::Error;

use crate::limits::RiskLimits;
use crate::pnl::PnlTracker;
use crate::position::PositionTracker;
use crate::token_bucket::TokenBucket;

/// An order intent awaiting risk approval.
#[derive(Debug, Clone, Copy)]
pub struct Intent {
    /// Instrument.
    pub symbol: Symbol,
    /// Side of the proposed order.
    pub side: Side,
    /// Proposed quantity.
    pub qty: Qty,
    /// Proposed price (used for projected-notional checks).
    pub price: Px,
    /// Fused signal magnitude backing this intent (§4.8 gate 8).
    pub signal_magnitude: f64,
}

/// Reason an intent was rejected, naming the specific gate in §4.8 that
/// failed (first-failure short-circuit, never more than one reason).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RiskError {
    /// Gate 1: kill-switch is sticky-tripped.
    #[error("kill-switch tripped")]
    KillSwitchTripped,
    /// Gate 2: cooldown has not elapsed since the last approval.
    #[error("cooldown not elapsed")]
    CooldownActive,
    /// Gate 3: token bucket exhausted.
    #[error("rate limit exceeded")]
    RateLimited,
    /// Gate 4: projected position would exceed the per-symbol cap.
    #[error("position limit exceeded")]
    PositionLimitExceeded,
    /// Gate 5a: projected global notional would exceed the cap.
    #[error("global notional limit exceeded")]
    GlobalNotionalExceeded,
    /// Gate 5b: projected per-symbol notional would exceed the cap.
    #[error("per-symbol notional limit exceeded")]
    SymbolNotionalExceeded,
    /// Gate 6: drawdown exceeds the configured fraction of peak PnL.
    #[error("drawdown limit breached")]
    DrawdownBreached,
    /// Gate 7: daily realized PnL is below the configured floor.
    #[error("daily loss limit breached")]
    DailyLossBreached,
    /// Gate 8: signal magnitude below the minimum confidence threshold.
    #[error("signal below minimum confidence")]
    BelowMinConfidence,
}

/// Outcome of evaluating an intent: approved, or rejected with the gate
/// that failed (I6: every approval implies all eight gates held).
pub type RiskDecision = Result<(), RiskError>;

/// The risk supervisor: owns the sticky kill-switch, the cooldown clock,
/// the token bucket, and reads (never writes) the shared
/// [`PositionTracker`] and [`PnlTracker`].
pub struct Supervisor {
    limits: RiskLimits,
    kill_switch: AtomicBool,
    last_approved_ms: AtomicU64,
    bucket: std::sync::Mutex<TokenBucket>,
}

impl Supervisor {
    /// Construct a supervisor with the given limits, anchored at `now_ms`.
    #[must_use]
    pub fn new(limits: RiskLimits, now_ms: u64) -> Self {
        Self {
            bucket: std::sync::Mutex::new(TokenBucket::new(limits.max_ops_per_sec, now_ms)),
            limits,
            kill_switch: AtomicBool::new(false),
            last_approved_ms: AtomicU64::new(0),
        }
    }

    /// Whether the kill-switch is currently tripped.
    #[must_use]
    pub fn is_killed(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }

    /// Clear the kill-switch. Sticky until an explicit external clear
    /// (§4.8): there is no automatic recovery path.
    pub fn clear_kill_switch(&self) {
        self.kill_switch.store(false, Ordering::SeqCst);
    }

    /// Evaluate `intent` against all eight gates in order (§4.8), using
    /// `positions`/`pnl` for the projection checks. On a drawdown or
    /// daily-loss breach the kill-switch is tripped sticky.
    pub fn evaluate(
        &self,
        intent: &Intent,
        positions: &PositionTracker,
        pnl: &PnlTracker,
        now_ms: u64,
    ) -> RiskDecision {
        if self.is_killed() {
            return Err(RiskError::KillSwitchTripped);
        }

        let last_approved = self.last_approved_ms.load(Ordering::SeqCst);
        if now_ms.saturating_sub(last_approved) < self.limits.cooldown_ms {
            return Err(RiskError::CooldownActive);
        }

        {
            let mut bucket = self.bucket.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if !bucket.try_take(now_ms) {
                return Err(RiskError::RateLimited);
            }
        }

        let snapshot = positions.snapshot(intent.symbol);
        let signed_delta = match intent.side {
            Side::Bid => intent.qty.as_f64(),
            Side::Ask => -intent.qty.as_f64(),
        };
        let projected_position = snapshot.size + signed_delta;
        if projected_position.abs() > self.limits.max_position_size {
            return Err(RiskError::PositionLimitExceeded);
        }

        let intent_notional = intent.qty.as_f64() * intent.price.as_f64();
        let projected_global = positions.global_notional() + intent_notional;
        if projected_global > self.limits.max_global_notional {
            return Err(RiskError::GlobalNotionalExceeded);
        }
        let projected_symbol = snapshot.notional + intent_notional;
        if projected_symbol > self.limits.max_notional_per_symbol {
            return Err(RiskError::SymbolNotionalExceeded);
        }

        if pnl.drawdown_pct() >= self.limits.max_drawdown_pct {
            self.kill_switch.store(true, Ordering::SeqCst);
            return Err(RiskError::DrawdownBreached);
        }
        if pnl.daily_realized() <= -self.limits.max_daily_loss {
            self.kill_switch.store(true, Ordering::SeqCst);
            return Err(RiskError::DailyLossBreached);
        }

        if intent.signal_magnitude.abs() < self.limits.min_confidence {
            return Err(RiskError::BelowMinConfidence);
        }

        self.last_approved_ms.store(now_ms, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(symbol: Symbol) -> Intent {
        Intent {
            symbol,
            side: Side::Bid,
            qty: Qty::new(1.0),
            price: Px::new(100.0),
            signal_magnitude: 0.5,
        }
    }

    #[test]
    fn approves_a_well_formed_intent() {
        let sup = Supervisor::new(RiskLimits::defaults(), 0);
        let positions = PositionTracker::new();
        let pnl = PnlTracker::new();
        let decision = sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 1_000);
        assert!(decision.is_ok());
    }

    #[test]
    fn cooldown_rejects_a_second_intent_too_soon() {
        let sup = Supervisor::new(RiskLimits::defaults(), 0);
        let positions = PositionTracker::new();
        let pnl = PnlTracker::new();
        sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 1_000)
            .unwrap();
        let decision = sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 1_100);
        assert_eq!(decision, Err(RiskError::CooldownActive));
    }

    #[test]
    fn drawdown_breach_trips_sticky_kill_switch_e2e_4() {
        let mut limits = RiskLimits::defaults();
        limits.max_drawdown_pct = 0.2;
        let sup = Supervisor::new(limits, 0);
        let positions = PositionTracker::new();
        let mut pnl = PnlTracker::new();
        pnl.on_execution(10.0);
        pnl.on_execution(7.0); // drawdown = 3, 3 > 0.2*10 = 2

        let decision = sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 1_000);
        assert_eq!(decision, Err(RiskError::DrawdownBreached));
        assert!(sup.is_killed());

        // Subsequent intents are rejected purely on the kill-switch.
        let decision2 = sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 100_000);
        assert_eq!(decision2, Err(RiskError::KillSwitchTripped));

        sup.clear_kill_switch();
        assert!(!sup.is_killed());
    }

    #[test]
    fn signal_below_min_confidence_is_rejected() {
        let sup = Supervisor::new(RiskLimits::defaults(), 0);
        let positions = PositionTracker::new();
        let pnl = PnlTracker::new();
        let mut weak = intent(Symbol::new("BTCUSDT"));
        weak.signal_magnitude = 0.001;
        let decision = sup.evaluate(&weak, &positions, &pnl, 1_000);
        assert_eq!(decision, Err(RiskError::BelowMinConfidence));
    }

    #[test]
    fn token_bucket_gate_is_and_combined_with_cooldown_design_note_a() {
        let mut limits = RiskLimits::defaults();
        limits.cooldown_ms = 0;
        limits.max_ops_per_sec = 1;
        let sup = Supervisor::new(limits, 0);
        let positions = PositionTracker::new();
        let pnl = PnlTracker::new();
        assert!(sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 0).is_ok());
        // Cooldown is satisfied (0ms) but the token bucket (1/s) is empty.
        let decision = sup.evaluate(&intent(Symbol::new("BTCUSDT")), &positions, &pnl, 0);
        assert_eq!(decision, Err(RiskError::RateLimited));
    }
}
