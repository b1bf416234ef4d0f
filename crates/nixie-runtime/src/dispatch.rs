//! Per-actor dispatch loop
//!
//! TigerStyle: One concurrency unit per actor, explicit state transitions,
//! tagged step outcomes instead of control-flow exceptions.
//!
//! The dispatch loop is the only place an actor's hooks run, which is what
//! makes "no two messages for one actor processed concurrently" true on any
//! substrate. Each processed envelope produces a [`Step`]:
//!
//! ```text
//! recv ----> handle_envelope ----> Continue       (loop again)
//!                            \---> Failed(error)  (report, loop again)
//!                             \--> StopRequested  (shutdown, exit)
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use nixie_core::error::Error;

use crate::actor::{Actor, ActorState};
use crate::mailbox::{Envelope, MailboxReceiver};
use crate::registry::ActorRegistry;

/// Outcome of handling one envelope
///
/// Stop is a data-level request observed at the loop boundary, never an
/// error; handler errors are tagged separately so the loop can report them
/// and keep going.
#[derive(Debug)]
pub enum Step {
    /// Envelope handled; keep looping
    Continue,
    /// Handler returned an error; report it, then keep looping
    Failed(Error),
    /// Stop sentinel observed; run shutdown and exit
    StopRequested,
}

/// The engine side of one actor: its hooks, mailbox, and lifecycle state
///
/// Owned entirely by the dispatch loop; nothing outside it touches the
/// actor value after spawn.
pub struct ActorCell<A: Actor> {
    urn: String,
    actor: A,
    mailbox: MailboxReceiver<A>,
    state_tx: watch::Sender<ActorState>,
    registry: Arc<ActorRegistry>,
}

impl<A: Actor> ActorCell<A> {
    /// Assemble a cell ready to run
    ///
    /// The state watch must still be at its initial `Starting` value.
    pub fn new(
        urn: String,
        actor: A,
        mailbox: MailboxReceiver<A>,
        state_tx: watch::Sender<ActorState>,
        registry: Arc<ActorRegistry>,
    ) -> Self {
        assert!(!urn.is_empty(), "actor urn must not be empty");
        assert_eq!(
            *state_tx.borrow(),
            ActorState::Starting,
            "actor state must begin at starting"
        );
        Self {
            urn,
            actor,
            mailbox,
            state_tx,
            registry,
        }
    }

    /// Run the dispatch loop to completion
    ///
    /// `on_start` completes before the first envelope is processed, so its
    /// effects are visible to the first message. A failed `on_start` reports
    /// through `on_failure` and goes straight to shutdown, skipping
    /// `on_stop`.
    #[instrument(skip(self), fields(urn = %self.urn), level = "debug")]
    pub async fn run(mut self) {
        debug!("Dispatch loop starting");

        if let Err(error) = self.actor.on_start().await {
            error!(error = %error, "on_start failed");
            self.report_failure(&error).await;
            self.shutdown(false).await;
            return;
        }
        self.transition(ActorState::Running);
        debug!("Actor running");

        loop {
            let Some(envelope) = self.mailbox.recv().await else {
                // Every sender dropped; nothing can reach this actor again.
                debug!("All mailbox senders dropped");
                break;
            };
            match self.handle_envelope(envelope).await {
                Step::Continue => {}
                Step::Failed(error) => self.report_failure(&error).await,
                Step::StopRequested => break,
            }
        }

        self.shutdown(true).await;
    }

    /// Handle one envelope and tag the outcome
    ///
    /// On success the reply future (if any) resolves with the handler's
    /// value. On failure it resolves with the error so the asker sees it,
    /// and the same error is tagged for local reporting; a teller's error
    /// is visible only through that report.
    async fn handle_envelope(&mut self, envelope: Envelope<A>) -> Step {
        assert!(
            self.state_tx.borrow().can_process(),
            "envelope dispatched while not running"
        );

        let (message, reply) = match envelope {
            Envelope::Stop => return Step::StopRequested,
            Envelope::Message { message, reply } => (message, reply),
        };

        match self.actor.on_receive(message).await {
            Ok(value) => {
                if let Some(reply) = reply {
                    reply.set(value);
                }
                Step::Continue
            }
            Err(error) => {
                if let Some(reply) = reply {
                    reply.set_exception(error.clone());
                }
                Step::Failed(error)
            }
        }
    }

    /// Route a hook error through `on_failure`
    ///
    /// A secondary failure inside `on_failure` is logged and swallowed so
    /// the loop survives and the actor can still reach `Stopped`.
    async fn report_failure(&mut self, error: &Error) {
        warn!(urn = %self.urn, error = %error, "Actor hook failed");
        if let Err(secondary) = self.actor.on_failure(error).await {
            error!(urn = %self.urn, error = %secondary, "on_failure itself failed");
        }
    }

    /// Wind the actor down to `Stopped`
    ///
    /// Closes the mailbox, rejects everything still queued with a dead-actor
    /// error, and deregisters. `run_on_stop` is false only when `on_start`
    /// failed, in which case `on_stop` has no started actor to clean up.
    async fn shutdown(&mut self, run_on_stop: bool) {
        self.transition(ActorState::Stopping);

        if run_on_stop {
            if let Err(error) = self.actor.on_stop().await {
                self.report_failure(&error).await;
            }
        }

        // Refuse new envelopes, then reject whatever was already queued.
        self.mailbox.close();
        let pending = self.mailbox.drain();
        let rejected = pending.len();
        for envelope in pending {
            if let Envelope::Message {
                reply: Some(reply), ..
            } = envelope
            {
                reply.set_exception(Error::actor_dead(self.urn.clone()));
            }
        }

        self.registry.unregister(&self.urn);
        self.transition(ActorState::Stopped);
        info!(urn = %self.urn, rejected, "Actor stopped");
    }

    /// Apply a validated lifecycle transition and publish it
    fn transition(&self, next: ActorState) {
        let current = *self.state_tx.borrow();
        assert!(
            current.can_transition_to(next),
            "invalid state transition: {} -> {}",
            current,
            next
        );
        self.state_tx.send_replace(next);
    }
}
