//! Error types for nixie
//!
//! TigerStyle: Explicit error types with context, using thiserror.
//!
//! The enum derives `Clone`: a reply future resolved with an error hands the
//! same failure to every waiter, so errors must be shareable. User-code
//! failures are wrapped in an `Arc` to preserve the original error's identity
//! across clones.

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for nixie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nixie error types
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The target actor has already stopped; its mailbox no longer accepts
    /// envelopes.
    #[error("actor {urn} is dead and cannot handle messages")]
    ActorDead { urn: String },

    /// An `ask` (or a timed future wait) exceeded its deadline. The envelope
    /// stays queued and is still processed; only the reply is discarded.
    #[error("ask timed out after {timeout_ms}ms")]
    AskTimeout { timeout_ms: u64 },

    /// A lifecycle hook reported a failure with a plain message.
    #[error("handler failed: {reason}")]
    Handler { reason: String },

    /// Internal invariant breakage that is not the caller's fault.
    #[error("internal error: {reason}")]
    Internal { reason: String },

    /// Arbitrary user-code error surfaced from a lifecycle hook.
    #[error("{0}")]
    Other(Arc<anyhow::Error>),
}

impl Error {
    /// Create an actor dead error
    pub fn actor_dead(urn: impl Into<String>) -> Self {
        Self::ActorDead { urn: urn.into() }
    }

    /// Create an ask timeout error
    pub fn ask_timeout(timeout_ms: u64) -> Self {
        Self::AskTimeout { timeout_ms }
    }

    /// Create a handler failure from a plain message
    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Check whether this error means the target actor is gone
    pub fn is_actor_dead(&self) -> bool {
        matches!(self, Self::ActorDead { .. })
    }

    /// Check whether this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AskTimeout { .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::actor_dead("urn:uuid:1234");
        assert!(err.to_string().contains("urn:uuid:1234"));

        let err = Error::ask_timeout(250);
        assert!(err.to_string().contains("250"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::actor_dead("x").is_actor_dead());
        assert!(!Error::actor_dead("x").is_timeout());
        assert!(Error::ask_timeout(1).is_timeout());
        assert!(!Error::handler("boom").is_actor_dead());
    }

    #[test]
    fn test_error_from_anyhow_preserves_identity_across_clones() {
        let err: Error = anyhow::anyhow!("user code exploded").into();
        let cloned = err.clone();

        match (&err, &cloned) {
            (Error::Other(a), Error::Other(b)) => {
                assert!(Arc::ptr_eq(a, b), "clones must share the original error");
            }
            _ => panic!("expected Other variants"),
        }
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
