//! FIX 4.4 wire format, transport, and session state machine (C3-C6).
//!
//! One crate because the wire format, the transport that frames it, and
//! the session state machine that drives it are one cohesive unit.

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod resend;
pub mod session;
pub mod tag;
pub mod transport;

pub use codec::{CodecError, FixBuilder, FixMessage};
pub use resend::{ResendRing, ResendSlot, CAP, MAX_MSG_LEN};
pub use session::{
    Failover, ReconnectBackoff, Session, SessionConfig, SessionError, SessionEvent, SessionPhase,
    SessionState, SessionStep,
};
pub use tag::{msg_type, tags};
pub use transport::{connect, FrameReader, FrameWriter, TransportError};
