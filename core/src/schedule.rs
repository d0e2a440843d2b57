//! Clock and timer collaborator.
//!
//! The reconciler never sleeps by itself: it asks a [`Scheduler`] for repeating
//! timers and one-shot delays and keeps the returned [`TimerHandle`]s. Dropping a
//! handle cancels the timer, so the owner's scope decides how long a timer lives.

use core::fmt;
use core::time::Duration;

use futures_lite::future::Boxed;
use time::OffsetDateTime;

use crate::release::Release;

/// Work performed on every tick of a repeating timer.
///
/// Each call produces the future for one tick; the next tick is not started before
/// the previous future has completed.
pub type Tick = Box<dyn FnMut() -> Boxed<()> + Send>;

/// Owned handle to an armed timer.
pub struct TimerHandle {
    release: Release,
}

impl TimerHandle {
    /// Wraps the action that cancels the underlying timer.
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Release::new(cancel),
        }
    }

    /// Cancels the timer. After this returns, its callback never runs again.
    pub fn cancel(mut self) {
        self.release.run();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

/// Provides the clock, repeating timers and one-shot delays.
pub trait Scheduler: Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> OffsetDateTime;

    /// Runs `tick` every `period`, starting one period from now.
    fn repeat(&self, period: Duration, tick: Tick) -> TimerHandle;

    /// Runs `fire` once after `delay`.
    fn once(&self, delay: Duration, fire: Box<dyn FnOnce() + Send>) -> TimerHandle;
}

impl<T: Scheduler> Scheduler for std::sync::Arc<T> {
    fn now(&self) -> OffsetDateTime {
        T::now(self)
    }

    fn repeat(&self, period: Duration, tick: Tick) -> TimerHandle {
        T::repeat(self, period, tick)
    }

    fn once(&self, delay: Duration, fire: Box<dyn FnOnce() + Send>) -> TimerHandle {
        T::once(self, delay, fire)
    }
}
