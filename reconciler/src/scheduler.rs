//! Scheduler backed by an async executor.

use std::time::Duration;

use async_io::Timer;
use executor_core::{Executor, Task};
use pdfchat_core::{OffsetDateTime, Scheduler, Tick, TimerHandle};
use tracing::trace;

/// Production [`Scheduler`]: wall-clock time, timers spawned on an executor.
///
/// Each timer runs as a detached task that sleeps with [`async_io::Timer`] and
/// races the sleep against a stop channel. Cancelling (or dropping) the handle
/// closes the channel, so a sleeping timer wakes up and exits without firing.
///
/// Use `executor_core::tokio::TokioGlobal` when running inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct ExecutorScheduler<E> {
    executor: E,
}

impl<E> ExecutorScheduler<E>
where
    E: Executor + Clone + Send + Sync + 'static,
{
    /// Creates a scheduler that spawns its timers on `executor`.
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }
}

/// Sleeps for `period` unless `stop` closes first. Returns `true` when the sleep
/// completed.
async fn sleep_or_stop(period: Duration, stop: &async_channel::Receiver<()>) -> bool {
    futures_lite::future::or(
        async {
            Timer::after(period).await;
            true
        },
        async {
            let _ = stop.recv().await;
            false
        },
    )
    .await
}

fn stop_channel() -> (TimerHandle, async_channel::Receiver<()>) {
    let (stop_tx, stop_rx) = async_channel::bounded::<()>(1);
    let handle = TimerHandle::new(move || {
        stop_tx.close();
    });
    (handle, stop_rx)
}

impl<E> Scheduler for ExecutorScheduler<E>
where
    E: Executor + Clone + Send + Sync + 'static,
{
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn repeat(&self, period: Duration, mut tick: Tick) -> TimerHandle {
        let (handle, stop) = stop_channel();
        self.executor
            .spawn(async move {
                while sleep_or_stop(period, &stop).await {
                    if stop.is_closed() {
                        break;
                    }
                    tick().await;
                }
                trace!("repeating timer finished");
            })
            .detach();
        handle
    }

    fn once(&self, delay: Duration, fire: Box<dyn FnOnce() + Send>) -> TimerHandle {
        let (handle, stop) = stop_channel();
        self.executor
            .spawn(async move {
                if sleep_or_stop(delay, &stop).await && !stop.is_closed() {
                    fire();
                }
            })
            .detach();
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_core::tokio::TokioGlobal;
    use futures_lite::future::Boxed;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(counter: &Arc<AtomicUsize>) -> Tick {
        let counter = Arc::clone(counter);
        Box::new(move || -> Boxed<()> {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeat_ticks_until_cancelled() {
        let scheduler = ExecutorScheduler::new(TokioGlobal);
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.repeat(Duration::from_millis(20), counting_tick(&ticks));

        Timer::after(Duration::from_millis(130)).await;
        handle.cancel();
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected at least two ticks, saw {seen}");

        Timer::after(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn once_fires_after_delay() {
        let scheduler = ExecutorScheduler::new(TokioGlobal);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let _handle = scheduler.once(
            Duration::from_millis(20),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        Timer::after(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_once_never_fires() {
        let scheduler = ExecutorScheduler::new(TokioGlobal);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let handle = scheduler.once(
            Duration::from_millis(40),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();

        Timer::after(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn now_is_utc() {
        let scheduler = ExecutorScheduler::new(TokioGlobal);
        assert!(scheduler.now().offset().is_utc());
    }
}
