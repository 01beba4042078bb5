//! Bounded lock-free MPMC queue (C2).
//!
//! Built directly on `crossbeam::queue::ArrayQueue`, a well-vetted bounded
//! ring, per Design Note: the source's block-linked MPMC with per-slot
//! "occupied" flags is not reproduced here. Fixed capacity, never grows.
//! `enqueue` never blocks and never allocates once constructed;
//! `try_dequeue` returns immediately if the queue is empty.

use crossbeam::queue::ArrayQueue;

/// A fixed-capacity, lock-free multi-producer/multi-consumer ring of `T`.
///
/// There is no ordering guarantee between distinct producers; a single
/// producer's pushes are observed in FIFO order by consumers. Backpressure
/// is never applied: a full queue causes `enqueue` to report failure rather
/// than block, so callers on the hot path must treat the queue as
/// best-effort or bound production upstream.
pub struct MpmcQueue<T> {
    ring: ArrayQueue<T>,
}

impl<T> MpmcQueue<T> {
    /// Construct a queue with a fixed capacity. Capacity is rounded up to
    /// at least 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Attempt to enqueue a value. Returns the value back on failure
    /// (queue full) rather than blocking.
    pub fn enqueue(&self, value: T) -> Result<(), T> {
        self.ring.push(value)
    }

    /// Attempt to dequeue a value. Returns `None` immediately if empty.
    pub fn try_dequeue(&self) -> Option<T> {
        self.ring.pop()
    }

    /// Number of elements currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the queue currently holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Fixed capacity of this queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}
