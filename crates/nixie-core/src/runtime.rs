//! Runtime abstraction for pluggable concurrency substrates
//!
//! TigerStyle: One explicit seam for everything substrate-specific.
//!
//! The actor engine never spawns tasks, reads clocks, or arms timers
//! directly; it goes through the [`ActorRuntime`] trait. Swapping the
//! substrate (multi-thread pool, current-thread, a deterministic test
//! executor) requires zero changes to actor, future, or scheduler logic.
//!
//! ```text
//! Production:            Anything else:
//! TokioRuntime ------> ActorRuntime <------ your substrate
//!     (tokio clock)      (trait)            (its own clock)
//! ```
//!
//! Mailboxes and futures are built on `tokio::sync` channels, which are
//! executor-agnostic; only spawn and time live behind this trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::SCHEDULE_DELAY_MS_MAX;

/// JoinHandle for spawned tasks
///
/// Abstracts over the substrate's own join handle type.
pub type JoinHandle<T> = Pin<Box<dyn Future<Output = Result<T, JoinError>> + Send>>;

/// Error from joining a task
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("task panicked")]
    Panicked,
    #[error("task cancelled")]
    Cancelled,
}

/// Instant in time, as milliseconds on the substrate's monotonic clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    /// Milliseconds since the substrate's epoch
    pub millis: u64,
}

impl Instant {
    /// Create a new instant from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Duration elapsed between this instant and a later reading
    pub fn elapsed(&self, now: Instant) -> Duration {
        Duration::from_millis(now.millis.saturating_sub(self.millis))
    }
}

/// Handle to a pending delayed call armed via [`ActorRuntime::schedule_after`]
///
/// Cancellation is best-effort: a callback that has already started cannot be
/// un-fired, but a not-yet-fired one is suppressed.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Create a fresh, un-fired handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the callback if it has not fired yet
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether this timer was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

/// Runtime abstraction trait
///
/// Implementations must guarantee:
/// - `spawn` begins running the future on a new concurrency unit without
///   blocking the caller;
/// - `sleep` suspends only the calling unit;
/// - `now` is monotonic within one substrate instance.
///
/// Note: this trait is NOT dyn-safe due to the generic `spawn`; the engine is
/// generic over a concrete runtime type instead.
#[async_trait::async_trait]
pub trait ActorRuntime: Send + Sync + Clone + 'static {
    /// Current instant on the substrate's monotonic clock
    fn now(&self) -> Instant;

    /// Sleep for a duration, suspending only the calling unit
    ///
    /// Preconditions: duration must be <= [`SCHEDULE_DELAY_MS_MAX`].
    async fn sleep(&self, duration: Duration);

    /// Yield control to the substrate's scheduler
    async fn yield_now(&self);

    /// Spawn a new concurrency unit running `future`
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;

    /// Invoke `f` once after `delay` on a unit that does not block the caller
    ///
    /// Returns a [`TimerHandle`]; cancelling it before the delay elapses
    /// prevents the call entirely. The default implementation rides on the
    /// substrate's own `spawn` and `sleep`.
    fn schedule_after<F>(&self, delay: Duration, f: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
        Self: Sized,
    {
        assert!(
            delay.as_millis() as u64 <= SCHEDULE_DELAY_MS_MAX,
            "schedule delay exceeds SCHEDULE_DELAY_MS_MAX"
        );

        let handle = TimerHandle::new();
        let flag = handle.flag();
        let runtime = self.clone();
        drop(self.spawn(async move {
            runtime.sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                f();
            }
        }));
        handle
    }
}

// =============================================================================
// TokioRuntime (production)
// =============================================================================

/// Production runtime backed by tokio
///
/// Uses the tokio clock for `now()`, so paused-time tests observe a clock
/// consistent with `sleep`. The epoch is captured per instance; clones share
/// it, so every handle derived from one runtime agrees on `now()`.
#[derive(Debug, Clone, Copy)]
pub struct TokioRuntime {
    epoch: tokio::time::Instant,
}

impl TokioRuntime {
    /// Create a runtime anchored at the current instant
    pub fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActorRuntime for TokioRuntime {
    fn now(&self) -> Instant {
        let elapsed = tokio::time::Instant::now().saturating_duration_since(self.epoch);
        Instant::from_millis(elapsed.as_millis() as u64)
    }

    async fn sleep(&self, duration: Duration) {
        assert!(
            duration.as_millis() as u64 <= SCHEDULE_DELAY_MS_MAX,
            "sleep duration exceeds SCHEDULE_DELAY_MS_MAX"
        );
        tokio::time::sleep(duration).await;
    }

    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }

    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(future);
        Box::pin(async move {
            handle.await.map_err(|e| {
                if e.is_panic() {
                    JoinError::Panicked
                } else {
                    JoinError::Cancelled
                }
            })
        })
    }
}
