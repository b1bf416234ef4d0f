//! Actor references
//!
//! TigerStyle: Non-owning handles; every operation on a stopped actor fails
//! explicitly, nothing hangs.
//!
//! An [`ActorRef`] points at one actor's mailbox and identity. Many refs may
//! point at one actor; a ref outlives the actor's stop and then turns inert,
//! failing with a dead-actor error. [`ActorHandle`] is the type-erased view
//! the registry stores.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use nixie_core::constants::ASK_TIMEOUT_MS_DEFAULT;
use nixie_core::error::{Error, Result};
use nixie_core::future::ActorFuture;
use nixie_core::runtime::{ActorRuntime, TokioRuntime};

use crate::actor::{Actor, ActorState};
use crate::mailbox::{Envelope, MailboxSender};

/// Handle for sending messages to one actor
pub struct ActorRef<A: Actor, R: ActorRuntime = TokioRuntime> {
    urn: String,
    sender: MailboxSender<A>,
    state_rx: watch::Receiver<ActorState>,
    runtime: R,
}

impl<A: Actor, R: ActorRuntime> Clone for ActorRef<A, R> {
    fn clone(&self) -> Self {
        Self {
            urn: self.urn.clone(),
            sender: self.sender.clone(),
            state_rx: self.state_rx.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<A: Actor, R: ActorRuntime> ActorRef<A, R> {
    pub(crate) fn new(
        urn: String,
        sender: MailboxSender<A>,
        state_rx: watch::Receiver<ActorState>,
        runtime: R,
    ) -> Self {
        assert!(!urn.is_empty(), "actor urn must not be empty");
        Self {
            urn,
            sender,
            state_rx,
            runtime,
        }
    }

    /// The actor's unique identifier
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Current lifecycle state
    pub fn state(&self) -> ActorState {
        *self.state_rx.borrow()
    }

    /// Check whether the actor can still accept envelopes
    pub fn is_alive(&self) -> bool {
        self.state() != ActorState::Stopped && !self.sender.is_closed()
    }

    /// Fire-and-forget send
    ///
    /// Non-blocking; the envelope takes the mailbox FIFO tail. Fails with a
    /// dead-actor error if the target has stopped.
    pub fn tell(&self, message: A::Message) -> Result<()> {
        self.enqueue(Envelope::tell(message))
    }

    /// Request/reply send, returning the pending reply future
    ///
    /// The caller decides how to wait; see [`ActorRef::ask`] for the common
    /// deadline-bounded wait.
    pub fn ask_future(&self, message: A::Message) -> Result<ActorFuture<A::Reply>> {
        let reply = ActorFuture::new();
        self.enqueue(Envelope::ask(message, reply.clone()))?;
        Ok(reply)
    }

    /// Request/reply send with the default deadline
    pub async fn ask(&self, message: A::Message) -> Result<A::Reply> {
        self.ask_with_timeout(message, Duration::from_millis(ASK_TIMEOUT_MS_DEFAULT))
            .await
    }

    /// Request/reply send with an explicit deadline
    ///
    /// On timeout the envelope stays queued and is still processed; only the
    /// reply is discarded by this now-abandoned waiter. A zero deadline is a
    /// non-blocking poll: it times out immediately unless the reply is
    /// somehow already there.
    pub async fn ask_with_timeout(
        &self,
        message: A::Message,
        timeout: Duration,
    ) -> Result<A::Reply> {
        let reply = self.ask_future(message)?;
        if timeout.is_zero() {
            return match reply.try_get() {
                Some(result) => result,
                None => Err(Error::ask_timeout(0)),
            };
        }
        tokio::select! {
            result = reply.get() => result,
            _ = self.runtime.sleep(timeout) => {
                debug!(urn = %self.urn, timeout_ms = timeout.as_millis() as u64, "ask timed out");
                Err(Error::ask_timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Request the actor to stop
    ///
    /// The stop sentinel takes an ordinary FIFO position, so every envelope
    /// enqueued before it is still processed. Returns immediately; use
    /// [`ActorRef::wait_stopped`] to await completion.
    pub fn stop(&self) -> Result<()> {
        self.enqueue(Envelope::Stop)
    }

    /// Wait until the actor has reached its terminal state
    pub async fn wait_stopped(&self) {
        let mut state_rx = self.state_rx.clone();
        // An error here means the dispatch unit is gone, which is as stopped
        // as it gets.
        let _ = state_rx.wait_for(|s| *s == ActorState::Stopped).await;
    }

    fn enqueue(&self, envelope: Envelope<A>) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::actor_dead(self.urn.clone()));
        }
        self.sender
            .send(envelope)
            .map_err(|_| Error::actor_dead(self.urn.clone()))
    }
}

/// Type-erased view of an [`ActorRef`]
///
/// Object-safe so the registry can hold actors of different message types in
/// one container.
#[async_trait]
pub trait ActorHandle: Send + Sync + 'static {
    /// The actor's unique identifier
    fn urn(&self) -> &str;

    /// Check whether the actor can still accept envelopes
    fn is_alive(&self) -> bool;

    /// Request the actor to stop (non-blocking)
    fn stop(&self) -> Result<()>;

    /// Wait until the actor has reached its terminal state
    async fn wait_stopped(&self);
}

#[async_trait]
impl<A: Actor, R: ActorRuntime> ActorHandle for ActorRef<A, R> {
    fn urn(&self) -> &str {
        self.urn()
    }

    fn is_alive(&self) -> bool {
        self.is_alive()
    }

    fn stop(&self) -> Result<()> {
        self.stop()
    }

    async fn wait_stopped(&self) {
        self.wait_stopped().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ActorSystem;
    use nixie_core::error::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum SlowCommand {
        IncrementSlow,
        Get,
    }

    struct SlowActor {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Actor for SlowActor {
        type Message = SlowCommand;
        type Reply = usize;

        async fn on_receive(&mut self, message: SlowCommand) -> Result<usize> {
            match message {
                SlowCommand::IncrementSlow => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(self.count.fetch_add(1, Ordering::SeqCst) + 1)
                }
                SlowCommand::Get => Ok(self.count.load(Ordering::SeqCst)),
            }
        }
    }

    fn spawn_slow(system: &ActorSystem) -> (ActorRef<SlowActor>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let actor_ref = system.start(SlowActor {
            count: Arc::clone(&count),
        });
        (actor_ref, count)
    }

    #[tokio::test]
    async fn test_ask_returns_reply() {
        let system = ActorSystem::new();
        let (actor_ref, _) = spawn_slow(&system);

        assert_eq!(actor_ref.ask(SlowCommand::Get).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_timeout_discards_reply_but_message_still_processed() {
        let system = ActorSystem::new();
        let (actor_ref, count) = spawn_slow(&system);

        let err = actor_ref
            .ask_with_timeout(SlowCommand::IncrementSlow, Duration::from_millis(30))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // The envelope stayed queued; the handler still runs to completion.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(actor_ref.ask(SlowCommand::Get).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ask_with_zero_timeout_polls_without_blocking() {
        let system = ActorSystem::new();
        let (actor_ref, count) = spawn_slow(&system);

        let err = actor_ref
            .ask_with_timeout(SlowCommand::IncrementSlow, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // The envelope was still enqueued and runs to completion.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tell_and_ask_on_stopped_actor_fail() {
        let system = ActorSystem::new();
        let (actor_ref, _) = spawn_slow(&system);

        actor_ref.stop().unwrap();
        actor_ref.wait_stopped().await;
        assert!(!actor_ref.is_alive());
        assert_eq!(actor_ref.state(), ActorState::Stopped);

        assert!(actor_ref.tell(SlowCommand::Get).unwrap_err().is_actor_dead());
        let err = actor_ref.ask(SlowCommand::Get).await.unwrap_err();
        assert!(err.is_actor_dead(), "ask must fail fast, not hang");
    }

    #[tokio::test]
    async fn test_clone_points_at_same_actor() {
        let system = ActorSystem::new();
        let (actor_ref, _) = spawn_slow(&system);
        let other = actor_ref.clone();

        assert_eq!(actor_ref.urn(), other.urn());
        actor_ref.stop().unwrap();
        other.wait_stopped().await;
        assert!(!other.is_alive());
    }

    #[tokio::test]
    async fn test_stop_on_stopped_actor_fails() {
        let system = ActorSystem::new();
        let (actor_ref, _) = spawn_slow(&system);

        actor_ref.stop().unwrap();
        actor_ref.wait_stopped().await;
        assert!(actor_ref.stop().unwrap_err().is_actor_dead());
    }

    #[tokio::test]
    async fn test_handle_erasure() {
        let system = ActorSystem::new();
        let (actor_ref, _) = spawn_slow(&system);

        let handle: Arc<dyn ActorHandle> = Arc::new(actor_ref.clone());
        assert_eq!(handle.urn(), actor_ref.urn());
        assert!(handle.is_alive());

        handle.stop().unwrap();
        handle.wait_stopped().await;
        assert!(!handle.is_alive());
    }
}
