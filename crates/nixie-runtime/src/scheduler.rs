//! Delayed and periodic message delivery
//!
//! TigerStyle: Two independent cancellation guards, explicit overrun policy.
//!
//! The scheduler arms substrate timers that `tell` a message to an actor.
//! Periodic variants re-arm themselves from inside each firing; one
//! [`Cancellable`] governs the whole chain:
//!
//! ```text
//! schedule_* --> timer --> fire --> tell --> arm next timer --+
//!                  ^                                          |
//!                  +------------- set_timer ------------------+
//! ```
//!
//! Cancellation racing a re-arm is handled twice: the firing step checks
//! `is_cancelled` immediately before arming, and `set_timer` refuses to
//! install onto a cancelled chain even if that check was passed earlier.
//! Both guards exist because the check and the arm happen at different
//! times.
//!
//! Fixed-rate overrun policy: when a firing lands past one or more period
//! boundaries, the chain does not burst-fire to catch up; the next firing is
//! scheduled at the first boundary strictly after now (see
//! [`next_fixed_rate_delay_ms`]'s tests).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, error};

use nixie_core::constants::{SCHEDULE_DELAY_MS_MAX, SCHEDULE_INTERVAL_MS_MIN};
use nixie_core::runtime::{ActorRuntime, TimerHandle, TokioRuntime};

use crate::actor::Actor;
use crate::actor_ref::ActorRef;

#[derive(Debug, Default)]
struct CancellableInner {
    cancelled: bool,
    timer: Option<TimerHandle>,
}

/// Handle to a delayed or periodic delivery chain
///
/// For periodic chains the held timer is replaced on every firing from the
/// timer's own unit, so flag and handle live under one lock; a cancel racing
/// a re-arm can never observe the flag without the timer it governs.
#[derive(Debug, Clone, Default)]
pub struct Cancellable {
    inner: Arc<Mutex<CancellableInner>>,
}

impl Cancellable {
    /// Create an active handle with no timer armed yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the chain has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Install the timer for the next firing
    ///
    /// Refuses on a cancelled chain, leaving the previously held handle
    /// untouched, and returns false; a racing re-arm can then not resurrect
    /// the chain.
    pub fn set_timer(&self, timer: TimerHandle) -> bool {
        let mut inner = self.lock();
        if inner.cancelled {
            error!("Attempted to install a timer on a cancelled chain");
            return false;
        }
        inner.timer = Some(timer);
        true
    }

    /// Cancel the chain
    ///
    /// First call cancels the held timer (best-effort: a firing already in
    /// progress cannot be un-fired, but its re-arm is suppressed) and
    /// returns true. Every later call returns false with no further effect.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.cancelled {
            return false;
        }
        inner.cancelled = true;
        match inner.timer.take() {
            Some(timer) => timer.cancel(),
            None => error!("Cancelled a chain that never armed a timer"),
        }
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CancellableInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Next delay to the first period boundary strictly after `now_ms`
///
/// `started_ms` is the nominal instant of the first firing; boundaries lie
/// at `started_ms + k * interval_ms`. Landing exactly on a boundary yields a
/// full interval, never zero, so an overrunning handler skips boundaries
/// instead of burst-firing.
fn next_fixed_rate_delay_ms(now_ms: u64, started_ms: u64, interval_ms: u64) -> u64 {
    assert!(
        interval_ms >= SCHEDULE_INTERVAL_MS_MIN,
        "interval below SCHEDULE_INTERVAL_MS_MIN"
    );
    let drift_ms = (now_ms as i64 - started_ms as i64).rem_euclid(interval_ms as i64);
    let delay_ms = interval_ms as i64 - drift_ms;
    assert!(delay_ms > 0 && delay_ms <= interval_ms as i64);
    delay_ms as u64
}

/// Issues delayed and periodic `tell` calls against actor references
#[derive(Debug, Clone)]
pub struct Scheduler<R: ActorRuntime = TokioRuntime> {
    runtime: R,
}

impl<R: ActorRuntime> Scheduler<R> {
    /// Create a scheduler over the given substrate
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Deliver `message` to `receiver` exactly once after `delay`
    ///
    /// Cancelling the returned handle before the firing prevents the tell
    /// entirely. A receiver that stops first just drops the delivery.
    pub fn schedule_once<A: Actor>(
        &self,
        delay: Duration,
        receiver: &ActorRef<A, R>,
        message: A::Message,
    ) -> Cancellable {
        assert!(
            delay.as_millis() as u64 <= SCHEDULE_DELAY_MS_MAX,
            "delay exceeds SCHEDULE_DELAY_MS_MAX"
        );

        let cancellable = Cancellable::new();
        let receiver = receiver.clone();
        let timer = self.runtime.schedule_after(delay, move || {
            if let Err(err) = receiver.tell(message) {
                debug!(urn = %receiver.urn(), error = %err, "One-shot delivery dropped");
            }
        });
        if !cancellable.set_timer(timer.clone()) {
            timer.cancel();
        }
        cancellable
    }

    /// Deliver `message` every `delay` after the previous delivery completed
    ///
    /// First delivery happens after `initial_delay`; each later one is
    /// anchored to the completion of the previous firing, so the chain
    /// drifts with handler latency.
    pub fn schedule_with_fixed_delay<A: Actor>(
        &self,
        initial_delay: Duration,
        delay: Duration,
        receiver: &ActorRef<A, R>,
        message: A::Message,
    ) -> Cancellable
    where
        A::Message: Clone + Sync,
    {
        self.tell_periodically(initial_delay, delay, receiver, message, false)
    }

    /// Deliver `message` every `period`, anchored to the original schedule
    ///
    /// Firings target `start + k * period` regardless of how long each
    /// delivery took; per-firing drift is compensated. An overrun skips
    /// ahead to the next boundary rather than bursting.
    pub fn schedule_at_fixed_rate<A: Actor>(
        &self,
        initial_delay: Duration,
        period: Duration,
        receiver: &ActorRef<A, R>,
        message: A::Message,
    ) -> Cancellable
    where
        A::Message: Clone + Sync,
    {
        self.tell_periodically(initial_delay, period, receiver, message, true)
    }

    fn tell_periodically<A: Actor>(
        &self,
        initial_delay: Duration,
        interval: Duration,
        receiver: &ActorRef<A, R>,
        message: A::Message,
        fixed_rate: bool,
    ) -> Cancellable
    where
        A::Message: Clone + Sync,
    {
        let interval_ms = interval.as_millis() as u64;
        assert!(
            interval_ms >= SCHEDULE_INTERVAL_MS_MIN,
            "interval below SCHEDULE_INTERVAL_MS_MIN"
        );
        assert!(
            initial_delay.as_millis() as u64 <= SCHEDULE_DELAY_MS_MAX,
            "initial delay exceeds SCHEDULE_DELAY_MS_MAX"
        );

        let cancellable = Cancellable::new();
        let job = Arc::new(PeriodicJob {
            runtime: self.runtime.clone(),
            receiver: receiver.clone(),
            message,
            interval_ms,
            started_ms: self.runtime.now().millis + initial_delay.as_millis() as u64,
            fixed_rate,
            cancellable: cancellable.clone(),
        });
        PeriodicJob::arm(job, initial_delay);
        cancellable
    }
}

/// One periodic chain: shared by every timer firing it spawns
struct PeriodicJob<A: Actor, R: ActorRuntime> {
    runtime: R,
    receiver: ActorRef<A, R>,
    message: A::Message,
    interval_ms: u64,
    /// Nominal instant of the first firing, on the runtime clock
    started_ms: u64,
    fixed_rate: bool,
    cancellable: Cancellable,
}

impl<A: Actor, R: ActorRuntime> PeriodicJob<A, R>
where
    A::Message: Clone + Sync,
{
    fn arm(job: Arc<Self>, delay: Duration) {
        // Checked immediately before arming; set_timer below re-checks under
        // the lock in case a cancel lands in between.
        if job.cancellable.is_cancelled() {
            return;
        }
        let firing = Arc::clone(&job);
        let timer = job.runtime.schedule_after(delay, move || Self::fire(firing));
        if !job.cancellable.set_timer(timer.clone()) {
            timer.cancel();
        }
    }

    fn fire(job: Arc<Self>) {
        if job.cancellable.is_cancelled() {
            return;
        }

        let now_ms = job.runtime.now().millis;
        let next_delay_ms = if job.fixed_rate || now_ms < job.started_ms {
            next_fixed_rate_delay_ms(now_ms, job.started_ms, job.interval_ms)
        } else {
            job.interval_ms
        };

        // A timer that fired ahead of the first nominal instant re-arms
        // without delivering.
        if now_ms >= job.started_ms {
            if let Err(err) = job.receiver.tell(job.message.clone()) {
                debug!(urn = %job.receiver.urn(), error = %err, "Stopping periodic chain");
                return;
            }
        }

        Self::arm(Arc::clone(&job), Duration::from_millis(next_delay_ms));
    }
}
