//! Single-assignment result container for request/reply
//!
//! TigerStyle: Resolve-once contract enforced with an assertion, not silently.
//!
//! An [`ActorFuture`] starts pending and transitions exactly once to either a
//! value or an error. Resolution is a broadcast: any number of waiters may
//! call [`ActorFuture::get`] concurrently and all observe the same outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};

struct Shared<T> {
    resolved: AtomicBool,
    tx: watch::Sender<Option<Result<T>>>,
}

/// Single-assignment async result container
///
/// Clones share the same slot; resolving any clone resolves them all.
pub struct ActorFuture<T> {
    shared: Arc<Shared<T>>,
    rx: watch::Receiver<Option<Result<T>>>,
}

impl<T> Clone for ActorFuture<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for ActorFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ActorFuture<T> {
    /// Create a new pending future
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                resolved: AtomicBool::new(false),
                tx,
            }),
            rx,
        }
    }

    /// Check whether this future has been resolved
    pub fn is_resolved(&self) -> bool {
        self.shared.resolved.load(Ordering::SeqCst)
    }

    /// Resolve with a value
    ///
    /// Panics if the future is already resolved; resolving twice is a
    /// programming error, never a recoverable condition.
    pub fn set(&self, value: T) {
        self.resolve(Ok(value));
    }

    /// Resolve with an error
    ///
    /// Same resolve-once contract as [`ActorFuture::set`].
    pub fn set_exception(&self, error: Error) {
        self.resolve(Err(error));
    }

    fn resolve(&self, result: Result<T>) {
        let already = self.shared.resolved.swap(true, Ordering::SeqCst);
        assert!(
            !already,
            "ActorFuture resolved twice; futures are single-assignment"
        );
        self.shared.tx.send_replace(Some(result));
    }
}

impl<T: Clone> ActorFuture<T> {
    /// Wait until resolved; returns the value or re-raises the stored error
    ///
    /// Safe to call from any number of waiters; all observe the identical
    /// outcome. There is no deadline here — callers that need one race this
    /// against their substrate's sleep (see `ActorRef::ask`).
    pub async fn get(&self) -> Result<T> {
        let mut rx = self.rx.clone();
        let slot = rx
            .wait_for(|slot| slot.is_some())
            .await
            .expect("resolution slot outlives every future clone");
        slot.clone().expect("slot checked to be resolved")
    }

    /// Non-blocking read of the resolved outcome, if any
    pub fn try_get(&self) -> Option<Result<T>> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_returns_set_value() {
        let future = ActorFuture::new();
        future.set(7_u64);
        assert_eq!(future.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_two_gets_observe_identical_value() {
        let future = ActorFuture::new();
        future.set("reply".to_string());

        let first = future.get().await.unwrap();
        let second = future.get().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_all_wake() {
        let future: ActorFuture<u32> = ActorFuture::new();

        let waiter_a = future.clone();
        let waiter_b = future.clone();
        let a = tokio::spawn(async move { waiter_a.get().await });
        let b = tokio::spawn(async move { waiter_b.get().await });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!future.is_resolved());
        future.set(99);

        assert_eq!(a.await.unwrap().unwrap(), 99);
        assert_eq!(b.await.unwrap().unwrap(), 99);
    }

    #[tokio::test]
    async fn test_get_reraises_stored_error() {
        let future: ActorFuture<u32> = ActorFuture::new();
        future.set_exception(Error::handler("boom"));

        let err = future.get().await.unwrap_err();
        assert!(matches!(err, Error::Handler { .. }));
        // A later waiter sees the same error again.
        let err = future.get().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    #[should_panic(expected = "single-assignment")]
    fn test_second_set_panics() {
        let future = ActorFuture::new();
        future.set(1_u8);
        future.set(2_u8);
    }

    #[test]
    #[should_panic(expected = "single-assignment")]
    fn test_set_exception_after_set_panics() {
        let future = ActorFuture::new();
        future.set(1_u8);
        future.set_exception(Error::handler("late"));
    }

    #[test]
    fn test_try_get_pending_and_resolved() {
        let future = ActorFuture::new();
        assert!(future.try_get().is_none());
        future.set(5_i32);
        assert_eq!(future.try_get().unwrap().unwrap(), 5);
    }
}
