//! Typed channel wrappers used for per-event-kind fan-out (tick, book, exec,
//! reject, state-change), replacing the nested callback plumbing of the
//! source (transport -> session -> bridge -> engine) with explicit channels
//! per Design Note.

use anyhow::Result;
use crossbeam::channel;

/// Marker trait for payloads that can travel over a [`Bus`] or SPSC
/// channel.
pub trait Message: Send + Sync + 'static {}

/// Publishes messages of type `T` onto a bus.
pub trait Publisher<T: Message> {
    /// Publish a message to the bus.
    fn publish(&self, msg: T) -> Result<()>;
}

/// Subscribes to messages of type `T` from a bus.
pub trait Subscriber<T: Message> {
    /// Obtain a receiver for this bus's messages.
    fn subscribe(&self) -> Result<Receiver<T>>;
}

/// Receiving end of a channel.
pub struct Receiver<T> {
    rx: channel::Receiver<T>,
}

impl<T> Receiver<T> {
    /// Receive a message, blocking until one is available.
    pub fn recv(&self) -> Result<T> {
        Ok(self.rx.recv()?)
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(channel::TryRecvError::Empty) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A single bounded or unbounded multi-producer multi-consumer channel for
/// one event kind (e.g. all tick events, all exec events).
pub struct Bus<T: Message> {
    tx: channel::Sender<T>,
    rx: channel::Receiver<T>,
}

impl<T: Message + Clone> Bus<T> {
    /// Create a new bounded bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Create a new unbounded bus. Reserved for cold paths (§5): the hot
    /// tick/log paths use [`crate::MpmcQueue`] instead.
    #[must_use]
    pub fn unbounded() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Obtain a publisher handle.
    #[must_use]
    pub fn publisher(&self) -> BusPublisher<T> {
        BusPublisher {
            tx: self.tx.clone(),
        }
    }

    /// Obtain a subscriber handle.
    #[must_use]
    pub fn subscriber(&self) -> BusSubscriber<T> {
        BusSubscriber {
            rx: self.rx.clone(),
        }
    }
}

/// Cloneable publish handle for a [`Bus`].
#[derive(Clone)]
pub struct BusPublisher<T> {
    tx: channel::Sender<T>,
}

impl<T: Message> Publisher<T> for BusPublisher<T> {
    fn publish(&self, msg: T) -> Result<()> {
        self.tx.send(msg)?;
        Ok(())
    }
}

/// Cloneable subscribe handle for a [`Bus`].
#[derive(Clone)]
pub struct BusSubscriber<T> {
    rx: channel::Receiver<T>,
}

impl<T: Message + Clone> Subscriber<T> for BusSubscriber<T> {
    fn subscribe(&self) -> Result<Receiver<T>> {
        Ok(Receiver {
            rx: self.rx.clone(),
        })
    }
}

/// Single-producer single-consumer channel factory.
pub struct SpscChannel;

impl SpscChannel {
    /// Create a new bounded SPSC channel.
    pub fn new<T: Send + 'static>(capacity: usize) -> (Sender<T>, Receiver<T>) {
        let (tx, rx) = channel::bounded(capacity);
        (Sender { tx }, Receiver { rx })
    }

    /// Create a new unbounded SPSC channel.
    pub fn unbounded<T: Send + 'static>() -> (Sender<T>, Receiver<T>) {
        let (tx, rx) = channel::unbounded();
        (Sender { tx }, Receiver { rx })
    }
}

/// Sending end of an SPSC channel.
pub struct Sender<T> {
    tx: channel::Sender<T>,
}

impl<T: Send + Sync + 'static> Sender<T> {
    /// Send a message, blocking if the channel is bounded and full.
    pub fn send(&self, msg: T) -> Result<()> {
        self.tx.send(msg)?;
        Ok(())
    }

    /// Try to send a message without blocking.
    pub fn try_send(&self, msg: T) -> Result<()> {
        self.tx.try_send(msg)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestMessage {
        id: u64,
        data: String,
    }

    impl Message for TestMessage {}

    #[test]
    fn spsc_channel_delivers_in_order() -> Result<()> {
        let (tx, rx) = SpscChannel::new::<TestMessage>(10);
        let msg = TestMessage {
            id: 1,
            data: "test".to_string(),
        };
        tx.send(msg.clone())?;
        let received = rx.recv()?;
        assert_eq!(msg, received);
        Ok(())
    }

    #[test]
    fn bus_pubsub_delivers_to_subscriber() -> Result<()> {
        let bus = Bus::<TestMessage>::new(10);
        let publisher = bus.publisher();
        let subscriber = bus.subscriber();
        let rx = subscriber.subscribe()?;

        let msg = TestMessage {
            id: 42,
            data: "hello".to_string(),
        };
        publisher.publish(msg.clone())?;
        let received = rx.recv()?;
        assert_eq!(msg, received);
        Ok(())
    }
}
