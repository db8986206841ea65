//! Time sources and delayed-callback scheduling for Tessera.
//!
//! Two small pieces the session layer needs from "the outside world":
//!
//! - [`Clock`]: what time is it right now (wall clock, UTC). Token
//!   expiry is an absolute timestamp chosen by the server, so the session
//!   compares against wall time, not a monotonic counter.
//! - [`DelayedTask`]: run a callback once after a delay, cancelable, with
//!   at most one pending callback per instance. This is the proactive
//!   refresh timer.
//!
//! # Testing with paused time
//!
//! [`DelayedTask`] sleeps on Tokio's clock, so `#[tokio::test(start_paused
//! = true)]` plus `tokio::time::advance` drives it deterministically.
//! [`MonotonicClock`] derives wall time from Tokio's clock too, so `now()`
//! moves forward in lock-step with the timers:
//!
//! ```ignore
//! let clock = MonotonicClock::new();
//! let t0 = clock.now();
//! tokio::time::advance(Duration::from_secs(60)).await;
//! assert_eq!(clock.now() - t0, TimeDelta::seconds(60));
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A source of the current wall-clock time.
///
/// Object-safe on purpose: the session manager stores an
/// `Arc<dyn Clock>` so swapping the clock in tests doesn't ripple a
/// generic parameter through every type.
pub trait Clock: Send + Sync + fmt::Debug + 'static {
    /// The current instant, in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall time anchored once, then advanced by Tokio's monotonic clock.
///
/// At construction it records `(Utc::now(), tokio::time::Instant::now())`.
/// Every later `now()` returns the anchor plus the Tokio time elapsed
/// since. Two consequences:
///
/// - system clock jumps (NTP corrections, manual changes) don't make
///   tokens look expired or fresh all of a sudden;
/// - under `tokio::time::pause()`, `now()` only moves when the test
///   advances time, exactly like the timers do.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_wall: DateTime<Utc>,
    anchor: TokioInstant,
}

impl MonotonicClock {
    /// Anchors to the current system time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchors to an explicit wall time (handy for reproducible tests).
    pub fn starting_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor: TokioInstant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TokioInstant::now().saturating_duration_since(self.anchor);
        TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|delta| self.anchor_wall.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A clock that only moves when told to.
///
/// For synchronous tests of expiry arithmetic. It does NOT drive
/// [`DelayedTask`]; use [`MonotonicClock`] with paused Tokio time for
/// anything involving timers.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jumps to an absolute time (backwards is allowed).
    pub fn set(&self, now: DateTime<Utc>) {
        *lock(&self.now) = now;
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = lock(&self.now);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

// ---------------------------------------------------------------------------
// DelayedTask
// ---------------------------------------------------------------------------

/// Stand-in deadline for delays too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A single, cancelable, delayed callback.
///
/// Like `setTimeout` with a handle you can clear, with one extra rule:
/// **scheduling always cancels whatever was pending first**, so an
/// instance never has more than one callback waiting.
///
/// The callback is a plain `FnOnce()`: it runs on the timer's own Tokio
/// task right after the sleep. If it needs to do async work it should
/// `tokio::spawn` it. That keeps the work alive even if the callback
/// itself reschedules (and therefore aborts) this timer.
///
/// Dropping the `DelayedTask` cancels the pending callback.
#[derive(Default)]
pub struct DelayedTask {
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl DelayedTask {
    /// Creates a timer with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` once after `delay`, replacing any pending callback.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.take() {
            if !previous.is_finished() {
                trace!("replacing pending delayed task");
            }
            previous.abort();
        }

        let now = TokioInstant::now();
        let deadline = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);
        *slot = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            trace!("delayed task fired");
            callback();
        }));

        debug!(delay_ms = delay.as_millis() as u64, "delayed task scheduled");
    }

    /// Cancels the pending callback, if any.
    ///
    /// Returns `true` if a callback was still waiting and got canceled.
    /// Safe to call repeatedly.
    pub fn cancel(&self) -> bool {
        let Some(handle) = lock(&self.slot).take() else {
            return false;
        };
        let was_pending = !handle.is_finished();
        handle.abort();
        if was_pending {
            debug!("delayed task canceled");
        }
        was_pending
    }

    /// Whether a callback is scheduled and hasn't fired yet.
    pub fn is_pending(&self) -> bool {
        lock(&self.slot)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for DelayedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedTask")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked.
/// Every critical section in this crate leaves the data consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-10-18T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_manual_clock_starts_frozen() {
        let clock = ManualClock::new(t0());
        assert_eq!(clock.now(), t0());
        assert_eq!(clock.now(), t0());
    }

    #[test]
    fn test_manual_clock_advance_moves_forward() {
        let clock = ManualClock::new(t0());
        clock.advance(TimeDelta::minutes(4));
        assert_eq!(clock.now(), t0() + TimeDelta::minutes(4));
    }

    #[test]
    fn test_manual_clock_set_can_go_backwards() {
        let clock = ManualClock::new(t0());
        clock.set(t0() - TimeDelta::hours(1));
        assert_eq!(clock.now(), t0() - TimeDelta::hours(1));
    }

    #[test]
    fn test_system_clock_is_close_to_utc_now() {
        let drift = SystemClock.now() - Utc::now();
        assert!(drift.num_seconds().abs() < 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_paused_tokio_time() {
        let clock = MonotonicClock::starting_at(t0());
        assert_eq!(clock.now(), t0());

        time::advance(Duration::from_secs(90)).await;

        assert_eq!(clock.now(), t0() + TimeDelta::seconds(90));
    }

    #[tokio::test]
    async fn test_cancel_without_schedule_returns_false() {
        let task = DelayedTask::new();
        assert!(!task.cancel());
        assert!(!task.is_pending());
    }
}
