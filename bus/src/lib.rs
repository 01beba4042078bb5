//! Concurrency fabric primitives (C2): a bounded lock-free MPMC ring for
//! the tick and log hot paths, plus typed channel wrappers for the
//! per-event-kind fan-out (tick, book, exec, reject, state-change) that
//! replaces nested callback plumbing.

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod queue;

pub use channel::{Bus, BusPublisher, BusSubscriber, Message, Publisher, Receiver, Sender, SpscChannel, Subscriber};
pub use queue::MpmcQueue;
