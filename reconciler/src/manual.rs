//! Deterministic scheduler driven by hand.
//!
//! [`ManualScheduler`] keeps a virtual clock that only moves when
//! [`advance`](ManualScheduler::advance) is called. Due timers fire in deadline
//! order (ties in arming order) on the calling thread, and the future of each
//! repeating tick is driven to completion before time moves on. Intended for tests
//! and simulations where the collaborators resolve without real I/O.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_lite::future::block_on;
use parking_lot::Mutex;
use pdfchat_core::{OffsetDateTime, Scheduler, Tick, TimerHandle};
use time::macros::datetime;

/// Scheduler with a virtual clock.
#[derive(Clone)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

enum Job {
    Once(Box<dyn FnOnce() + Send>),
    Repeat { period: Duration, tick: Tick },
}

struct Armed {
    due: Duration,
    job: Job,
    cancelled: Arc<AtomicBool>,
}

struct ManualState {
    origin: OffsetDateTime,
    elapsed: Duration,
    next_id: u64,
    timers: BTreeMap<u64, Armed>,
    cancelled_repeating: usize,
    ticks: usize,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Creates a scheduler whose clock starts at 2024-01-01 00:00 UTC.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(datetime!(2024-01-01 0:00 UTC))
    }

    /// Creates a scheduler whose clock starts at `origin`.
    #[must_use]
    pub fn starting_at(origin: OffsetDateTime) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                origin,
                elapsed: Duration::ZERO,
                next_id: 0,
                timers: BTreeMap::new(),
                cancelled_repeating: 0,
                ticks: 0,
            })),
        }
    }

    /// Time elapsed since the origin.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Moves the clock forward, firing every timer that falls due on the way.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().elapsed + by;
        loop {
            let next = {
                let mut state = self.state.lock();
                let candidate = state
                    .timers
                    .iter()
                    .filter(|(_, armed)| armed.due <= target)
                    .min_by_key(|(id, armed)| (armed.due, **id))
                    .map(|(id, _)| *id);
                match candidate.and_then(|id| state.timers.remove(&id).map(|armed| (id, armed))) {
                    Some((id, armed)) => {
                        state.elapsed = armed.due;
                        Some((id, armed))
                    }
                    None => {
                        state.elapsed = target;
                        None
                    }
                }
            };
            let Some((id, armed)) = next else {
                break;
            };

            match armed.job {
                Job::Once(fire) => fire(),
                Job::Repeat { period, mut tick } => {
                    block_on(tick());
                    let mut state = self.state.lock();
                    state.ticks += 1;
                    if !armed.cancelled.load(Ordering::Acquire) {
                        state.timers.insert(
                            id,
                            Armed {
                                due: armed.due + period,
                                job: Job::Repeat { period, tick },
                                cancelled: armed.cancelled,
                            },
                        );
                    }
                }
            }
        }
    }

    /// Number of repeating timers currently armed.
    #[must_use]
    pub fn repeating_timers(&self) -> usize {
        self.count(|job| matches!(job, Job::Repeat { .. }))
    }

    /// Number of one-shot timers waiting to fire.
    #[must_use]
    pub fn pending_delays(&self) -> usize {
        self.count(|job| matches!(job, Job::Once(_)))
    }

    /// How many repeating timers have been cancelled so far.
    #[must_use]
    pub fn cancelled_repeating(&self) -> usize {
        self.state.lock().cancelled_repeating
    }

    /// How many repeating ticks have run so far.
    #[must_use]
    pub fn ticks(&self) -> usize {
        self.state.lock().ticks
    }

    fn count(&self, predicate: impl Fn(&Job) -> bool) -> usize {
        self.state
            .lock()
            .timers
            .values()
            .filter(|armed| predicate(&armed.job))
            .count()
    }

    fn arm(&self, delay: Duration, job: Job) -> TimerHandle {
        let repeating = matches!(job, Job::Repeat { .. });
        let cancelled = Arc::new(AtomicBool::new(false));
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            let due = state.elapsed + delay;
            state.timers.insert(
                id,
                Armed {
                    due,
                    job,
                    cancelled: Arc::clone(&cancelled),
                },
            );
            id
        };

        let weak: Weak<Mutex<ManualState>> = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            cancelled.store(true, Ordering::Release);
            if let Some(state) = weak.upgrade() {
                let mut state = state.lock();
                state.timers.remove(&id);
                if repeating {
                    state.cancelled_repeating += 1;
                }
            }
        })
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> OffsetDateTime {
        let state = self.state.lock();
        state.origin + state.elapsed
    }

    fn repeat(&self, period: Duration, tick: Tick) -> TimerHandle {
        self.arm(period, Job::Repeat { period, tick })
    }

    fn once(&self, delay: Duration, fire: Box<dyn FnOnce() + Send>) -> TimerHandle {
        self.arm(delay, Job::Once(fire))
    }
}

impl core::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("elapsed", &state.elapsed)
            .field("armed", &state.timers.len())
            .finish()
    }
}
