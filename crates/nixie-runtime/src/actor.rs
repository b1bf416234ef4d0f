//! Actor trait and lifecycle state machine
//!
//! TigerStyle: Explicit lifecycle states, single dispatch-unit guarantee.
//!
//! An actor owns private state, processes one message at a time, and is
//! driven by exactly one concurrency unit for its whole life. User code
//! supplies the four lifecycle hooks; the engine calls them at fixed points
//! in the dispatch loop (see `dispatch`).

use async_trait::async_trait;

use nixie_core::error::{Error, Result};

/// Actor lifecycle state
///
/// - `Starting`: dispatch loop spawned, `on_start` not yet complete
/// - `Running`: processing messages
/// - `Stopping`: stop request observed, `on_stop` in progress
/// - `Stopped`: terminal; the mailbox no longer accepts envelopes
///
/// State transitions:
/// ```text
///   +----------+     +---------+     +----------+     +---------+
///   | Starting | --> | Running | --> | Stopping | --> | Stopped |
///   +----------+     +---------+     +----------+     +---------+
///        |                                 ^
///        +---------------------------------+
///             (on_start failed)
/// ```
///
/// `Stopped` is terminal; there is no restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorState {
    /// Dispatch loop spawned, `on_start` has not completed yet
    #[default]
    Starting,
    /// Actor is processing messages
    Running,
    /// Stop request observed, shutdown hooks running
    Stopping,
    /// Terminal state; no transitions out
    Stopped,
}

impl ActorState {
    /// Check if the actor is processing messages
    ///
    /// Envelopes are only dispatched to user code in this state.
    pub fn can_process(&self) -> bool {
        matches!(self, ActorState::Running)
    }

    /// Check if a transition to `next` is valid
    pub fn can_transition_to(&self, next: ActorState) -> bool {
        match (self, next) {
            // From Starting: Running (on_start succeeded) or Stopping (it failed)
            (ActorState::Starting, ActorState::Running) => true,
            (ActorState::Starting, ActorState::Stopping) => true,
            // From Running: only a stop request moves us on
            (ActorState::Running, ActorState::Stopping) => true,
            // From Stopping: shutdown completes
            (ActorState::Stopping, ActorState::Stopped) => true,
            // Same state is allowed (no change)
            _ if *self == next => true,
            // All other transitions are invalid
            _ => false,
        }
    }
}

impl std::fmt::Display for ActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorState::Starting => write!(f, "starting"),
            ActorState::Running => write!(f, "running"),
            ActorState::Stopping => write!(f, "stopping"),
            ActorState::Stopped => write!(f, "stopped"),
        }
    }
}

/// User-implemented actor behavior
///
/// The engine guarantees:
/// - `on_start` completes before the first `on_receive`;
/// - `on_receive` calls are strictly sequential, in mailbox FIFO order;
/// - `on_stop` runs after the last processed message, unless `on_start`
///   itself failed;
/// - `on_failure` is called for every hook error, and its own errors are
///   reported and swallowed so the actor still reaches `Stopped`.
///
/// `Reply: Clone` because a reply future broadcasts its outcome to every
/// waiter.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Message type this actor handles
    type Message: Send + 'static;
    /// Reply type produced for `ask`
    type Reply: Clone + Send + Sync + 'static;

    /// Called once before any message is processed
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Handle one message; the returned value resolves the asker's future
    async fn on_receive(&mut self, message: Self::Message) -> Result<Self::Reply>;

    /// Called once during shutdown, after the last processed message
    async fn on_stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when a hook returned an error; for local reporting only
    async fn on_failure(&mut self, _error: &Error) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_state_transitions() {
        assert!(ActorState::Starting.can_transition_to(ActorState::Running));
        assert!(ActorState::Starting.can_transition_to(ActorState::Stopping)); // Failed start
        assert!(ActorState::Running.can_transition_to(ActorState::Stopping));
        assert!(ActorState::Stopping.can_transition_to(ActorState::Stopped));

        // Invalid transitions
        assert!(!ActorState::Starting.can_transition_to(ActorState::Stopped)); // Skip Stopping
        assert!(!ActorState::Running.can_transition_to(ActorState::Stopped));
        assert!(!ActorState::Stopped.can_transition_to(ActorState::Running)); // Terminal
        assert!(!ActorState::Stopped.can_transition_to(ActorState::Starting));
        assert!(!ActorState::Stopping.can_transition_to(ActorState::Running));
    }

    #[test]
    fn test_actor_state_can_process() {
        assert!(!ActorState::Starting.can_process());
        assert!(ActorState::Running.can_process());
        assert!(!ActorState::Stopping.can_process());
        assert!(!ActorState::Stopped.can_process());
    }

    #[test]
    fn test_actor_state_default() {
        assert_eq!(ActorState::default(), ActorState::Starting);
    }

    #[test]
    fn test_actor_state_display() {
        assert_eq!(format!("{}", ActorState::Starting), "starting");
        assert_eq!(format!("{}", ActorState::Running), "running");
        assert_eq!(format!("{}", ActorState::Stopping), "stopping");
        assert_eq!(format!("{}", ActorState::Stopped), "stopped");
    }
}
