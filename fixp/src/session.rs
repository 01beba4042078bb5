//! FIX session state machine (C5): logon, heartbeat/test-request cycle,
//! sequence tracking, resend/gap-fill, logout, reconnect backoff, and
//! advisory primary/backup failover.
//!
//! The FSM is driven purely by explicit calls (`on_tcp_up`, `on_message`,
//! `on_timer_tick`, ...) so it can be unit-tested without a socket; the
//! caller (the engine's session worker) is responsible for wiring a real
//! [`crate::transport::FrameReader`]/[`crate::transport::FrameWriter`] and
//! a [`common::Clock`] to these calls.

use std::collections::VecDeque;

use thiserror::Error;

use crate::codec::{FixBuilder, FixMessage};
use crate::resend::ResendRing;
use crate::tag::{msg_type, tags};

/// Phase of a FIX session (§3 `SessionState.phase`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No transport, not attempting one.
    Disconnected,
    /// TCP connect in flight.
    Connecting,
    /// TCP up, Logon sent, awaiting peer Logon.
    LoggingIn,
    /// Steady state: heartbeats, market data, orders flow.
    LoggedIn,
    /// Logout sent, awaiting ack or timeout.
    LoggingOut,
}

/// Errors surfaced by the session FSM (§7 error taxonomy).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Inbound sequence number is ahead of what was expected.
    #[error("sequence gap: expected {expected}, got {got}")]
    SeqGap {
        /// Sequence the session expected next.
        expected: u64,
        /// Sequence actually received.
        got: u64,
    },
    /// Inbound sequence is behind expected and not marked `PossDup`
    /// (spec.md's explicit resolution of Design Note (b): fatal, not a
    /// silent accept-and-advance).
    #[error("fatal sequence regression: expected {expected}, got {got} without PossDup")]
    SeqRegression {
        /// Sequence the session expected next.
        expected: u64,
        /// Sequence actually received.
        got: u64,
    },
    /// The frame failed checksum or body-length validation; dropped, not
    /// fatal.
    #[error("bad frame: {0}")]
    BadFrame(String),
    /// Peer rejected our Logon.
    #[error("logon rejected: {0}")]
    LogonRejected(String),
}

/// Structured session-level events surfaced to the supervisor (C11), in
/// place of a generic boolean "rejected"/"ok" (Design Note: descriptive
/// structured log events over booleans).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// TCP established, Logon sent.
    Connecting,
    /// Peer's Logon accepted; session now `LoggedIn`.
    LoggedIn,
    /// A bad-frame (checksum/body-length) was dropped.
    BadFrameDropped,
    /// A sequence gap was detected; a ResendRequest was emitted.
    SeqGapDetected {
        /// First missing sequence (`7=`).
        from: u64,
        /// Sequence that triggered the gap (exclusive upper bound,
        /// `16=0` means "through current").
        through_current: bool,
    },
    /// An inbound message with `43=Y` and seq < expected was accepted
    /// without advancing `expected_in_seq` (distinct from `GapFillAdvanced`
    /// per Design Note's PossDup/GapFill bookkeeping distinction).
    PossDupAccepted {
        /// The duplicate sequence number observed.
        sequence: u64,
    },
    /// A SequenceReset/GapFill advanced `expected_in_seq`.
    GapFillAdvanced {
        /// New expected sequence after the gap-fill.
        new_expected: u64,
    },
    /// Peer sent a session-level Reject (35=3) carrying a human-readable
    /// reason (tag 58).
    Reject {
        /// `58=` text, if the peer supplied one.
        text: Option<String>,
    },
    /// Session logged out / torn down. Carries the reason for the
    /// supervisor to log.
    Disconnected {
        /// Human-readable reason.
        reason: String,
    },
    /// Failover advisory fired: switch target to the backup host.
    FailoverAdvised,
}

/// Per-session sequence/timing state (§3 `SessionState`).
pub struct SessionState {
    /// Next inbound sequence number expected.
    pub expected_in_seq: u64,
    /// Next outbound sequence number to assign.
    pub outbound_seq: u64,
    /// `SenderCompID` (tag 49) this side identifies as.
    pub sender_comp_id: String,
    /// `TargetCompID` (tag 56) of the peer.
    pub target_comp_id: String,
    /// Negotiated heartbeat interval, seconds.
    pub heartbeat_secs: u64,
    /// Monotonic-µs timestamp of the last inbound message.
    pub last_rx_micros: u64,
    /// Monotonic-µs timestamp of the last outbound message.
    pub last_tx_micros: u64,
    /// Current FSM phase.
    pub phase: SessionPhase,
}

impl SessionState {
    fn new(sender_comp_id: String, target_comp_id: String, heartbeat_secs: u64) -> Self {
        Self {
            expected_in_seq: 1,
            outbound_seq: 1,
            sender_comp_id,
            target_comp_id,
            heartbeat_secs,
            last_rx_micros: 0,
            last_tx_micros: 0,
            phase: SessionPhase::Disconnected,
        }
    }
}

/// Reconnect backoff policy: `min=100ms`, `max=5000ms`, `factor=2.0` by
/// default (§4.4), reset on successful logon.
pub struct ReconnectBackoff {
    min_ms: u64,
    max_ms: u64,
    factor: f64,
    current_ms: u64,
}

impl ReconnectBackoff {
    /// Construct a new backoff policy.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64, factor: f64) -> Self {
        Self {
            min_ms,
            max_ms,
            factor,
            current_ms: min_ms,
        }
    }

    /// Next delay to wait before attempting reconnect, doubling (capped at
    /// `max_ms`) each call.
    pub fn next_delay_ms(&mut self) -> u64 {
        let delay = self.current_ms;
        self.current_ms = ((self.current_ms as f64) * self.factor).min(self.max_ms as f64) as u64;
        delay
    }

    /// Reset to the minimum delay, called on successful logon.
    pub fn reset(&mut self) {
        self.current_ms = self.min_ms;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(100, 5_000, 2.0)
    }
}

/// Latency-based failover advisory (§4.4, Design Note (a) supplement):
/// tracks a rolling heartbeat round-trip time and recommends a switch to
/// the backup host when the p99 estimate exceeds `threshold_ms`. The
/// decision is advisory and is only consulted at heartbeat boundaries.
pub struct Failover {
    samples: VecDeque<u64>,
    capacity: usize,
    threshold_ms: u64,
    has_backup: bool,
}

impl Failover {
    /// Construct a failover monitor. `threshold_ms` defaults to 40ms per
    /// §4.4.
    #[must_use]
    pub fn new(has_backup: bool, threshold_ms: u64) -> Self {
        Self {
            samples: VecDeque::with_capacity(64),
            capacity: 64,
            threshold_ms,
            has_backup,
        }
    }

    /// Record one heartbeat round-trip latency sample, in milliseconds.
    pub fn record_rtt_ms(&mut self, rtt_ms: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(rtt_ms);
    }

    /// p99 of the recorded samples (nearest-rank), or `None` if empty.
    #[must_use]
    pub fn p99_ms(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64) * 0.99).ceil() as usize;
        let idx = idx.saturating_sub(1).min(sorted.len() - 1);
        Some(sorted[idx])
    }

    /// Whether, on this heartbeat boundary, the session should fail over
    /// to the configured backup host.
    #[must_use]
    pub fn should_failover(&self) -> bool {
        self.has_backup && self.p99_ms().is_some_and(|p99| p99 > self.threshold_ms)
    }
}

/// Configuration needed to construct a [`Session`].
pub struct SessionConfig {
    /// This side's `SenderCompID`.
    pub sender_comp_id: String,
    /// Peer's `TargetCompID`.
    pub target_comp_id: String,
    /// Heartbeat interval, seconds (tag 108).
    pub heartbeat_secs: u64,
    /// Whether a backup host is configured (drives [`Failover`]).
    pub has_backup: bool,
    /// Failover RTT threshold, milliseconds. Defaults to 40 per §4.4.
    pub failover_threshold_ms: u64,
}

/// The FIX session FSM (C5): owns sequence state, the resend ring, the
/// reconnect backoff, and the failover advisory. Produces outbound wire
/// frames for the caller to hand to [`crate::transport::FrameWriter`], and
/// [`SessionEvent`]s for the caller to forward to the supervisor.
pub struct Session {
    state: SessionState,
    ring: ResendRing,
    backoff: ReconnectBackoff,
    failover: Failover,
    /// Test-request id counter, for the heartbeat/test-request cycle.
    test_req_seq: u64,
    /// Whether a TestRequest is currently outstanding (awaiting a reply
    /// before the session is declared dead).
    test_req_outstanding: bool,
    /// Monotonic-µs timestamp the outstanding TestRequest was sent at.
    test_req_sent_at: u64,
}

/// Small tuple of (outbound wire bytes, events) a single FSM call can
/// produce.
pub struct SessionStep {
    /// Wire frames to send, in order.
    pub outbound: Vec<Vec<u8>>,
    /// Events for the caller to forward to the supervisor.
    pub events: Vec<SessionEvent>,
}

impl SessionStep {
    fn empty() -> Self {
        Self {
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl Session {
    /// Construct a new, disconnected session.
    #[must_use]
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            state: SessionState::new(cfg.sender_comp_id, cfg.target_comp_id, cfg.heartbeat_secs),
            ring: ResendRing::new(),
            backoff: ReconnectBackoff::default(),
            failover: Failover::new(cfg.has_backup, cfg.failover_threshold_ms),
            test_req_seq: 0,
            test_req_outstanding: false,
            test_req_sent_at: 0,
        }
    }

    /// Current FSM phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Next inbound sequence expected (I1).
    #[must_use]
    pub fn expected_in_seq(&self) -> u64 {
        self.state.expected_in_seq
    }

    /// Next outbound sequence to be assigned (I2).
    #[must_use]
    pub fn next_outbound_seq(&self) -> u64 {
        self.state.outbound_seq
    }

    fn builder(&self) -> FixBuilder {
        FixBuilder::new()
    }

    fn send(&mut self, body: FixBuilder, msg_type: &str, now_micros: u64) -> Vec<u8> {
        let seq = self.state.outbound_seq;
        let frame = body.build(msg_type, &self.state.sender_comp_id, &self.state.target_comp_id, seq);
        self.ring.store(seq, &frame);
        self.state.outbound_seq += 1;
        self.state.last_tx_micros = now_micros;
        frame
    }

    /// `start()`: `Disconnected -> Connecting`, establishing TCP is the
    /// caller's job; this just marks the phase and returns the Logon frame
    /// once the caller reports the socket is up via [`Self::on_tcp_up`].
    pub fn start(&mut self) {
        self.state.phase = SessionPhase::Connecting;
    }

    /// `Connecting -> LoggingIn`: TCP established, send Logon.
    pub fn on_tcp_up(&mut self, now_micros: u64) -> SessionStep {
        self.state.phase = SessionPhase::LoggingIn;
        let body = self
            .builder()
            .int(tags::ENCRYPT_METHOD as u32, 0)
            .int(tags::HEART_BT_INT as u32, self.state.heartbeat_secs as i64);
        let frame = self.send(body, msg_type::LOGON, now_micros);
        SessionStep {
            outbound: vec![frame],
            events: vec![SessionEvent::Connecting],
        }
    }

    /// Transport-down notification from C3: tear the session down and
    /// schedule a reconnect.
    pub fn on_transport_down(&mut self, reason: &str) -> SessionStep {
        self.state.phase = SessionPhase::Disconnected;
        self.test_req_outstanding = false;
        SessionStep {
            outbound: Vec::new(),
            events: vec![SessionEvent::Disconnected {
                reason: reason.to_string(),
            }],
        }
    }

    /// Milliseconds to wait before the next reconnect attempt.
    pub fn next_reconnect_delay_ms(&mut self) -> u64 {
        self.backoff.next_delay_ms()
    }

    /// Whether, at this heartbeat boundary, a switch to the backup host is
    /// advised (§4.4).
    #[must_use]
    pub fn should_failover(&self) -> bool {
        self.failover.should_failover()
    }

    /// Feed one inbound FIX message to the FSM. Returns any outbound
    /// frames (ResendRequest, Heartbeat reply, etc.) and session events.
    pub fn on_message(&mut self, msg: &FixMessage<'_>, now_micros: u64) -> SessionStep {
        self.state.last_rx_micros = now_micros;
        let Some(seq) = msg.get_uint_fast(tags::MSG_SEQ_NUM) else {
            return SessionStep::empty();
        };
        let mt = msg.get_str(tags::MSG_TYPE).unwrap_or_default();

        if mt == msg_type::LOGON && self.state.phase == SessionPhase::LoggingIn {
            self.state.phase = SessionPhase::LoggedIn;
            self.state.expected_in_seq = seq + 1;
            self.backoff.reset();
            return SessionStep {
                outbound: Vec::new(),
                events: vec![SessionEvent::LoggedIn],
            };
        }

        // A Logon reject can arrive as either a session-level Reject or a
        // Logout while we're still waiting for the peer's Logon (§4.4:
        // "LoggingIn -> Disconnected" on reject).
        if self.state.phase == SessionPhase::LoggingIn
            && (mt == msg_type::REJECT || mt == msg_type::LOGOUT)
        {
            self.state.phase = SessionPhase::Disconnected;
            let text = msg.get_str(tags::TEXT).unwrap_or("logon rejected").to_string();
            return SessionStep {
                outbound: Vec::new(),
                events: vec![SessionEvent::Disconnected { reason: text }],
            };
        }

        if mt == msg_type::REJECT {
            let text = msg.get_str(tags::TEXT).map(str::to_string);
            return SessionStep {
                outbound: Vec::new(),
                events: vec![SessionEvent::Reject { text }],
            };
        }

        if self.state.phase != SessionPhase::LoggedIn {
            return SessionStep::empty();
        }

        // SequenceReset / GapFill: advances expected_in_seq irrespective of
        // where it falls relative to the current counter.
        if mt == msg_type::SEQUENCE_RESET {
            let is_gap_fill = msg.get_bool_fast(tags::GAP_FILL_FLAG).unwrap_or(false)
                || msg.get_bool_fast(tags::GAP_FILL_FLAG_LEGACY).unwrap_or(false);
            if is_gap_fill {
                if let Some(new_seq) = msg.get_uint_fast(tags::NEW_SEQ_NO) {
                    self.state.expected_in_seq = new_seq;
                    return SessionStep {
                        outbound: Vec::new(),
                        events: vec![SessionEvent::GapFillAdvanced {
                            new_expected: new_seq,
                        }],
                    };
                }
            }
        }

        if mt == msg_type::RESEND_REQUEST {
            return self.service_resend_request(msg, now_micros);
        }

        if mt == msg_type::HEARTBEAT && self.test_req_outstanding {
            self.test_req_outstanding = false;
            let rtt_ms = (now_micros.saturating_sub(self.test_req_sent_at)) / 1_000;
            self.failover.record_rtt_ms(rtt_ms);
        }

        if mt == msg_type::LOGOUT {
            self.state.phase = SessionPhase::Disconnected;
            return SessionStep {
                outbound: Vec::new(),
                events: vec![SessionEvent::Disconnected {
                    reason: "peer logout".to_string(),
                }],
            };
        }

        // General sequence bookkeeping for any other in-session message,
        // TestRequest included: it gets the same gap/regression treatment
        // as every other message type, so an out-of-order TestRequest
        // can't silently advance expected_in_seq.
        let expected = self.state.expected_in_seq;
        if seq == expected {
            self.state.expected_in_seq += 1;
            if mt == msg_type::TEST_REQUEST {
                let id = msg.get_str(tags::TEST_REQ_ID).unwrap_or_default();
                let body = self.builder().field(tags::TEST_REQ_ID as u32, id);
                let frame = self.send(body, msg_type::HEARTBEAT, now_micros);
                SessionStep {
                    outbound: vec![frame],
                    events: Vec::new(),
                }
            } else {
                SessionStep::empty()
            }
        } else if seq > expected {
            let body = self
                .builder()
                .int(tags::BEGIN_SEQ_NO as u32, expected as i64)
                .int(tags::END_SEQ_NO as u32, 0);
            let frame = self.send(body, msg_type::RESEND_REQUEST, now_micros);
            SessionStep {
                outbound: vec![frame],
                events: vec![SessionEvent::SeqGapDetected {
                    from: expected,
                    through_current: true,
                }],
            }
        } else {
            // seq < expected
            let poss_dup = msg.get_bool_fast(tags::POSS_DUP_FLAG).unwrap_or(false);
            if poss_dup {
                SessionStep {
                    outbound: Vec::new(),
                    events: vec![SessionEvent::PossDupAccepted { sequence: seq }],
                }
            } else {
                self.state.phase = SessionPhase::Disconnected;
                SessionStep {
                    outbound: Vec::new(),
                    events: vec![SessionEvent::Disconnected {
                        reason: format!(
                            "fatal sequence regression: expected {expected}, got {seq} without PossDup"
                        ),
                    }],
                }
            }
        }
    }

    /// Service a peer's ResendRequest (`35=2`) by replaying stored
    /// messages from the ring, falling back to gap-fills for sequences the
    /// ring no longer holds.
    fn service_resend_request(&mut self, msg: &FixMessage<'_>, now_micros: u64) -> SessionStep {
        let begin = msg.get_uint_fast(tags::BEGIN_SEQ_NO).unwrap_or(1);
        let requested_end = msg.get_uint_fast(tags::END_SEQ_NO).unwrap_or(0);
        let end = if requested_end == 0 {
            self.ring.head()
        } else {
            requested_end
        };

        let mut outbound = Vec::new();
        let mut cursor = begin;
        for seq in begin..=end.max(begin) {
            match self.ring.fetch(seq) {
                Some(bytes) => {
                    if cursor < seq {
                        outbound.push(self.gap_fill(cursor, seq, now_micros));
                    }
                    outbound.push(bytes.to_vec());
                    cursor = seq + 1;
                }
                None => continue,
            }
        }
        if cursor <= end {
            outbound.push(self.gap_fill(cursor, end + 1, now_micros));
        }

        SessionStep {
            outbound,
            events: Vec::new(),
        }
    }

    /// Build a gap-fill SequenceReset covering `[from, new_seq)`.
    fn gap_fill(&mut self, from: u64, new_seq: u64, now_micros: u64) -> Vec<u8> {
        let body = self
            .builder()
            .field(tags::GAP_FILL_FLAG as u32, "Y")
            .int(tags::NEW_SEQ_NO as u32, new_seq as i64);
        // Gap-fills must carry `from` as their own MsgSeqNum, not the
        // auto-incrementing outbound counter, since they stand in for the
        // sequence range they cover.
        let frame = body.build(
            msg_type::SEQUENCE_RESET,
            &self.state.sender_comp_id,
            &self.state.target_comp_id,
            from,
        );
        self.state.last_tx_micros = now_micros;
        frame
    }

    /// Timer tick driving the heartbeat/test-request cycle (§4.4, B3). The
    /// caller invokes this on a regular schedule (e.g. every 250ms) and
    /// forwards the resulting outbound frames/events.
    pub fn on_timer_tick(&mut self, now_micros: u64) -> SessionStep {
        if self.state.phase != SessionPhase::LoggedIn {
            return SessionStep::empty();
        }

        let hb_micros = self.state.heartbeat_secs * 1_000_000;
        // Grace window added on top of `hb` before escalating silence on
        // the RX side into a TestRequest (§4.4: "no RX for hb+delta"). A
        // session that is merely quiet on the wire still heartbeats on the
        // shorter `hb`-only window below; this only fires once that's
        // been quiet for appreciably longer.
        let delta_micros = hb_micros / 2;
        let since_tx = now_micros.saturating_sub(self.state.last_tx_micros);
        let since_rx = now_micros.saturating_sub(self.state.last_rx_micros);

        if self.test_req_outstanding {
            if now_micros.saturating_sub(self.test_req_sent_at) >= hb_micros {
                self.state.phase = SessionPhase::Disconnected;
                self.test_req_outstanding = false;
                return SessionStep {
                    outbound: Vec::new(),
                    events: vec![SessionEvent::Disconnected {
                        reason: "test request timeout".to_string(),
                    }],
                };
            }
            return SessionStep::empty();
        }

        if since_tx >= hb_micros {
            let frame = self.send(self.builder(), msg_type::HEARTBEAT, now_micros);
            return SessionStep {
                outbound: vec![frame],
                events: Vec::new(),
            };
        }

        if since_rx >= hb_micros + delta_micros {
            self.test_req_seq += 1;
            let id = format!("TR{}", self.test_req_seq);
            let body = self.builder().field(tags::TEST_REQ_ID as u32, id);
            let frame = self.send(body, msg_type::TEST_REQUEST, now_micros);
            self.test_req_outstanding = true;
            self.test_req_sent_at = now_micros;
            return SessionStep {
                outbound: vec![frame],
                events: Vec::new(),
            };
        }

        if self.should_failover() {
            return SessionStep {
                outbound: Vec::new(),
                events: vec![SessionEvent::FailoverAdvised],
            };
        }

        SessionStep::empty()
    }

    /// `LoggingOut`: send Logout and wait for ack/timeout.
    pub fn logout(&mut self, now_micros: u64) -> SessionStep {
        self.state.phase = SessionPhase::LoggingOut;
        let frame = self.send(self.builder(), msg_type::LOGOUT, now_micros);
        SessionStep {
            outbound: vec![frame],
            events: Vec::new(),
        }
    }
}

/// Helper used only by tests: parse a `|`-delimited template into a decoded
/// [`FixMessage`] owned by the caller's buffer.
#[cfg(test)]
fn parse_template(buf: &mut Vec<u8>, template: &str) {
    *buf = template
        .bytes()
        .map(|b| if b == b'|' { crate::codec::SOH } else { b })
        .collect();
}
