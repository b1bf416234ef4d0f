//! Actor mailbox implementation
//!
//! TigerStyle: Strict FIFO, no silent drops.
//!
//! The mailbox is a single FIFO per actor; all envelopes enqueued for one
//! actor are processed in enqueue order regardless of sender. A stop request
//! travels through the same queue as an ordinary envelope, so every message
//! enqueued before it is still processed.

use tokio::sync::mpsc;

use nixie_core::future::ActorFuture;

use crate::actor::Actor;

/// Error when the mailbox no longer accepts envelopes
///
/// The receiving half is dropped or closed once the actor's dispatch loop
/// exits; enqueueing after that point is a dead-actor condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailboxClosedError;

impl std::fmt::Display for MailboxClosedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mailbox closed: actor dispatch loop has exited")
    }
}

impl std::error::Error for MailboxClosedError {}

/// A queued unit of work for one actor
///
/// `Message` carries the payload and, for `ask`, the reply future to resolve.
/// `Stop` is the stop sentinel: it takes an ordinary FIFO position, which is
/// what guarantees all earlier messages are processed before shutdown.
pub enum Envelope<A: Actor> {
    /// An application message
    Message {
        /// The payload handed to `on_receive`
        message: A::Message,
        /// Reply future (present for ask, absent for tell)
        reply: Option<ActorFuture<A::Reply>>,
    },
    /// Stop sentinel
    Stop,
}

impl<A: Actor> Envelope<A> {
    /// Envelope for a fire-and-forget send
    pub fn tell(message: A::Message) -> Self {
        Self::Message {
            message,
            reply: None,
        }
    }

    /// Envelope for a request/reply send
    pub fn ask(message: A::Message, reply: ActorFuture<A::Reply>) -> Self {
        debug_assert!(!reply.is_resolved(), "reply future must start pending");
        Self::Message {
            message,
            reply: Some(reply),
        }
    }

    /// Check whether this is the stop sentinel
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl<A: Actor> std::fmt::Debug for Envelope<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message { reply, .. } => f
                .debug_struct("Envelope::Message")
                .field("has_reply", &reply.is_some())
                .finish(),
            Self::Stop => write!(f, "Envelope::Stop"),
        }
    }
}

/// Create a linked mailbox sender/receiver pair
pub fn mailbox<A: Actor>() -> (MailboxSender<A>, MailboxReceiver<A>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MailboxSender { tx }, MailboxReceiver { rx })
}

/// Enqueueing half of a mailbox
///
/// Cheap to clone; every `ActorRef` holds one.
pub struct MailboxSender<A: Actor> {
    tx: mpsc::UnboundedSender<Envelope<A>>,
}

impl<A: Actor> Clone for MailboxSender<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A: Actor> MailboxSender<A> {
    /// Enqueue an envelope at the FIFO tail
    ///
    /// Non-blocking. Fails only when the dispatch loop has exited.
    pub fn send(&self, envelope: Envelope<A>) -> Result<(), MailboxClosedError> {
        self.tx.send(envelope).map_err(|_| MailboxClosedError)
    }

    /// Check whether the receiving half is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Dequeueing half of a mailbox; owned by the dispatch loop
pub struct MailboxReceiver<A: Actor> {
    rx: mpsc::UnboundedReceiver<Envelope<A>>,
}

impl<A: Actor> MailboxReceiver<A> {
    /// Wait for the next envelope
    ///
    /// Returns `None` once the mailbox is closed and drained, or when every
    /// sender has been dropped.
    pub async fn recv(&mut self) -> Option<Envelope<A>> {
        self.rx.recv().await
    }

    /// Stop accepting new envelopes
    ///
    /// Already-queued envelopes remain readable via `try_recv`/`drain`.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Take every envelope still queued, preserving FIFO order
    ///
    /// Used during shutdown to reject pending work.
    pub fn drain(&mut self) -> Vec<Envelope<A>> {
        let mut drained = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            drained.push(envelope);
        }
        drained
    }
}
