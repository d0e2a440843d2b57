//! Behavior of the reconciler against a scripted status source and a hand-driven clock.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_lite::future::block_on;
use parking_lot::Mutex;
use pdfchat_core::{
    ChangeEvent, DocumentId, EventSink, LifecycleState, PushEvent, Scheduler, Severity,
    StatusReport, StatusSource, Subscription,
};
use pdfchat_reconciler::{
    DEFAULT_FAILURE_MESSAGE, ManualScheduler, Reconciler, ReconcilerConfig, messages,
};

const POLL: Duration = Duration::from_secs(3);
const TTL: Duration = Duration::from_secs(10);

/// Status source that replays scripted fetch results and records channel usage.
///
/// Once the script runs out, the last scripted response is repeated.
#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<StatusReport, String>>>,
    last: Mutex<Option<Result<StatusReport, String>>>,
    fetched: Mutex<Vec<String>>,
    sinks: Mutex<Vec<EventSink>>,
    subscribed: AtomicUsize,
    unsubscribed: Arc<AtomicUsize>,
    refuse_subscription: AtomicBool,
}

impl ScriptedSource {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn respond(&self, state: &str) {
        self.respond_with(StatusReport::new(state));
    }

    fn respond_with(&self, report: StatusReport) {
        self.responses.lock().push_back(Ok(report));
    }

    fn fail_next(&self, message: &str) {
        self.responses.lock().push_back(Err(message.to_owned()));
    }

    fn fetches(&self) -> usize {
        self.fetched.lock().len()
    }

    fn subscriptions(&self) -> usize {
        self.subscribed.load(Ordering::SeqCst)
    }

    fn unsubscriptions(&self) -> usize {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    fn sink(&self, index: usize) -> EventSink {
        Arc::clone(&self.sinks.lock()[index])
    }

    /// Delivers an event through the most recent subscription's sink.
    fn push(&self, event: PushEvent) {
        let sink = self.sinks.lock().last().cloned().expect("no subscription");
        sink(event);
    }

    fn push_state(&self, state: &str) {
        self.push(PushEvent::Change(ChangeEvent::update(state)));
    }
}

impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, id: &DocumentId) -> pdfchat_core::Result<StatusReport> {
        self.fetched.lock().push(id.as_str().to_owned());
        let next = self.responses.lock().pop_front();
        let response = match next {
            Some(response) => {
                *self.last.lock() = Some(response.clone());
                response
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(StatusReport::empty())),
        };
        response.map_err(|message| anyhow::anyhow!(message))
    }

    fn subscribe(
        &self,
        _id: &DocumentId,
        on_event: EventSink,
    ) -> pdfchat_core::Result<Subscription> {
        if self.refuse_subscription.load(Ordering::SeqCst) {
            anyhow::bail!("realtime unavailable");
        }
        self.subscribed.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().push(on_event);
        let unsubscribed = Arc::clone(&self.unsubscribed);
        Ok(Subscription::new(move || {
            unsubscribed.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

type TestReconciler = Reconciler<Arc<ScriptedSource>, ManualScheduler>;

fn harness() -> (TestReconciler, Arc<ScriptedSource>, ManualScheduler) {
    let source = ScriptedSource::new();
    let scheduler = ManualScheduler::new();
    let reconciler = Reconciler::new(Arc::clone(&source), scheduler.clone());
    (reconciler, source, scheduler)
}

fn doc(id: &str) -> DocumentId {
    DocumentId::parse(id).expect("non-empty id")
}

fn message(reconciler: &TestReconciler) -> Option<String> {
    reconciler.current_notification().map(|n| n.message)
}

#[test]
fn terminal_state_is_final() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));

    source.push_state("completed");
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
    assert!(reconciler.is_closed());

    source.push_state("processing");
    source.respond("failed");
    scheduler.advance(POLL * 10);
    reconciler.on_update(StatusReport::new("queued"));

    assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
    assert_eq!(source.fetches(), 1);
}

#[test]
fn empty_id_does_nothing() {
    let (reconciler, source, scheduler) = harness();
    block_on(reconciler.start_raw(""));
    block_on(reconciler.start_raw("   "));
    block_on(reconciler.start(None));

    assert_eq!(source.fetches(), 0);
    assert_eq!(source.subscriptions(), 0);
    assert_eq!(scheduler.repeating_timers(), 0);
    assert!(!reconciler.is_polling());
    assert_eq!(reconciler.current_state(), None);
    assert_eq!(reconciler.document_id(), None);
}

#[test]
fn lifecycle_notifications_and_release_on_completion() {
    let (reconciler, source, scheduler) = harness();
    source.respond("uploading");
    block_on(reconciler.start_raw("doc-1"));

    let uploading = reconciler.current_notification().unwrap();
    assert_eq!(uploading.severity, Severity::Info);
    assert_eq!(uploading.message, messages::UPLOADING);
    assert!(reconciler.is_polling());
    assert!(reconciler.is_subscribed());
    assert_eq!(scheduler.repeating_timers(), 1);

    source.push_state("processing");
    let processing = reconciler.current_notification().unwrap();
    assert_eq!(processing.severity, Severity::Info);
    assert_eq!(processing.message, messages::PROCESSING);

    source.respond("completed");
    scheduler.advance(POLL);
    let completed = reconciler.current_notification().unwrap();
    assert_eq!(completed.severity, Severity::Success);
    assert_eq!(completed.message, messages::COMPLETED);

    assert!(!reconciler.is_polling());
    assert!(!reconciler.is_subscribed());
    assert_eq!(scheduler.repeating_timers(), 0);
    assert_eq!(scheduler.cancelled_repeating(), 1);
    assert_eq!(source.unsubscriptions(), 1);
}

#[test]
fn fetch_failure_keeps_state_and_polling() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    source.fail_next("connection reset");
    scheduler.advance(POLL);
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));
    let error = reconciler.current_notification().unwrap();
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.message, messages::FETCH_FAILED);
    assert!(reconciler.is_polling());

    source.respond("processing");
    scheduler.advance(POLL);
    let info = reconciler.current_notification().unwrap();
    assert_eq!(info.severity, Severity::Info);
    assert_eq!(info.message, messages::PROCESSING);
    assert_eq!(source.fetches(), 3);
}

#[test]
fn dismiss_clears_without_time_passing() {
    let (reconciler, source, scheduler) = harness();
    source.respond("queued");
    block_on(reconciler.start_raw("doc-1"));
    assert_eq!(message(&reconciler).as_deref(), Some(messages::QUEUED));
    assert_eq!(scheduler.pending_delays(), 1);

    reconciler.dismiss_notification();
    assert_eq!(reconciler.current_notification(), None);
    assert_eq!(scheduler.pending_delays(), 0);
    assert_eq!(scheduler.elapsed(), Duration::ZERO);
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Queued));
}

#[test]
fn notification_clears_exactly_at_ttl() {
    let (reconciler, source, scheduler) = harness();
    reconciler.bind(doc("doc-1"));
    reconciler.on_update(StatusReport::new("processing"));
    assert!(reconciler.is_polling());

    scheduler.advance(TTL - Duration::from_millis(1));
    assert_eq!(message(&reconciler).as_deref(), Some(messages::PROCESSING));

    scheduler.advance(Duration::from_millis(1));
    assert_eq!(reconciler.current_notification(), None);
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));
    // Unscripted polls return no state and are dropped without touching the banner.
    assert_eq!(source.fetches(), 3);
}

#[test]
fn bound_direct_update_arms_polling() {
    let (reconciler, source, scheduler) = harness();
    reconciler.bind(doc("doc-1"));
    assert_eq!(reconciler.document_id(), Some(doc("doc-1")));
    assert!(!reconciler.is_polling());
    assert_eq!(source.fetches(), 0);
    assert_eq!(source.subscriptions(), 0);

    reconciler.on_update(StatusReport::new("processing"));
    assert!(reconciler.is_polling());
    assert_eq!(scheduler.repeating_timers(), 1);

    source.respond("completed");
    scheduler.advance(POLL);
    assert_eq!(source.fetches(), 1);
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
    assert!(!reconciler.is_polling());

    scheduler.advance(POLL * 5);
    assert_eq!(source.fetches(), 1);
}

#[test]
fn bound_terminal_update_never_polls() {
    let (reconciler, source, scheduler) = harness();
    reconciler.bind(doc("doc-1"));
    reconciler.on_update(StatusReport::new("ready"));

    assert!(reconciler.is_closed());
    assert_eq!(scheduler.repeating_timers(), 0);
    scheduler.advance(POLL * 3);
    assert_eq!(source.fetches(), 0);
}

#[test]
fn unbound_direct_update_has_nothing_to_poll() {
    let (reconciler, source, scheduler) = harness();
    reconciler.on_update(StatusReport::new("processing"));
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));
    assert!(!reconciler.is_polling());
    scheduler.advance(POLL * 3);
    assert_eq!(source.fetches(), 0);
}

#[test]
fn start_replaces_a_bound_session() {
    let (reconciler, source, scheduler) = harness();
    reconciler.bind(doc("doc-1"));
    reconciler.on_update(StatusReport::new("processing"));
    assert!(reconciler.is_polling());

    source.respond("queued");
    block_on(reconciler.start_raw("doc-2"));
    assert_eq!(scheduler.cancelled_repeating(), 1);
    assert_eq!(scheduler.repeating_timers(), 1);
    assert_eq!(reconciler.document_id(), Some(doc("doc-2")));
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Queued));
}

#[test]
fn newer_notification_restarts_the_window() {
    let (reconciler, _source, scheduler) = harness();
    reconciler.on_update(StatusReport::new("queued"));
    scheduler.advance(Duration::from_secs(6));
    reconciler.on_update(StatusReport::new("processing"));
    assert_eq!(scheduler.pending_delays(), 1);

    scheduler.advance(Duration::from_secs(4));
    assert_eq!(message(&reconciler).as_deref(), Some(messages::PROCESSING));

    scheduler.advance(Duration::from_secs(6));
    assert_eq!(reconciler.current_notification(), None);
}

#[test]
fn stop_is_idempotent() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    reconciler.stop();
    reconciler.stop();

    assert_eq!(source.unsubscriptions(), 1);
    assert_eq!(scheduler.cancelled_repeating(), 1);
    assert_eq!(scheduler.repeating_timers(), 0);
    assert!(reconciler.is_closed());
}

#[test]
fn stop_leaves_the_notification_to_its_ttl() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    reconciler.stop();
    assert_eq!(message(&reconciler).as_deref(), Some(messages::PROCESSING));
    assert_eq!(scheduler.pending_delays(), 1);

    scheduler.advance(TTL - Duration::from_secs(1));
    assert_eq!(message(&reconciler).as_deref(), Some(messages::PROCESSING));
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(reconciler.current_notification(), None);
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));
}

#[test]
fn notification_can_be_dismissed_after_stop() {
    let (reconciler, source, scheduler) = harness();
    source.respond("queued");
    block_on(reconciler.start_raw("doc-1"));
    reconciler.stop();

    reconciler.dismiss_notification();
    assert_eq!(reconciler.current_notification(), None);
    assert_eq!(scheduler.pending_delays(), 0);
}

#[test]
fn events_after_stop_are_ignored() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    reconciler.stop();

    source.push_state("completed");
    scheduler.advance(POLL * 3);

    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));
    assert_eq!(source.fetches(), 1);
}

#[test]
fn terminal_first_fetch_opens_no_channels() {
    let (reconciler, source, scheduler) = harness();
    source.respond("ready");
    block_on(reconciler.start_raw("doc-1"));

    assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
    assert_eq!(source.subscriptions(), 0);
    assert_eq!(scheduler.repeating_timers(), 0);
    assert!(reconciler.is_closed());
}

#[test]
fn failure_uses_error_detail_and_stops_polling() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    source.push(PushEvent::Change(
        ChangeEvent::update("failed").with_error("No text could be extracted"),
    ));
    let failed = reconciler.current_notification().unwrap();
    assert_eq!(failed.severity, Severity::Error);
    assert_eq!(failed.message, "No text could be extracted");
    assert!(!reconciler.is_polling());

    scheduler.advance(POLL * 2);
    assert_eq!(source.fetches(), 1);
}

#[test]
fn failure_without_detail_uses_fallback() {
    let (reconciler, source, _scheduler) = harness();
    source.respond_with(StatusReport::new("error"));
    block_on(reconciler.start_raw("doc-1"));

    assert_eq!(reconciler.current_state(), Some(LifecycleState::Failed));
    assert_eq!(message(&reconciler).as_deref(), Some(DEFAULT_FAILURE_MESSAGE));
}

#[test]
fn subscription_failure_falls_back_to_polling() {
    let (reconciler, source, scheduler) = harness();
    source.refuse_subscription.store(true, Ordering::SeqCst);
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    let error = reconciler.current_notification().unwrap();
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.message, messages::SUBSCRIPTION_FAILED);
    assert!(!reconciler.is_subscribed());
    assert!(reconciler.is_polling());

    source.respond("completed");
    scheduler.advance(POLL);
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
}

#[test]
fn channel_error_keeps_polling() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    source.push(PushEvent::ChannelError("socket closed".to_owned()));
    assert_eq!(
        message(&reconciler).as_deref(),
        Some(messages::SUBSCRIPTION_FAILED)
    );
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));

    scheduler.advance(POLL);
    assert_eq!(source.fetches(), 2);
}

#[test]
fn unrecognized_state_is_dropped() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    let before = reconciler.snapshot();

    scheduler.advance(Duration::from_secs(1));
    source.push_state("archived");
    reconciler.on_update(StatusReport::empty());

    assert_eq!(reconciler.snapshot(), before);
}

#[test]
fn repeated_state_refreshes_notification() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    let first = reconciler.current_notification().unwrap();

    scheduler.advance(POLL);
    let second = reconciler.current_notification().unwrap();
    assert_eq!(second.message, first.message);
    assert_eq!(second.emitted_at, first.emitted_at + POLL);
    assert_eq!(reconciler.last_updated_at(), Some(scheduler.now()));
}

#[test]
fn restart_resets_the_session() {
    let (reconciler, source, scheduler) = harness();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    let old_sink = source.sink(0);

    source.respond("queued");
    block_on(reconciler.start_raw("doc-2"));

    assert_eq!(reconciler.document_id().unwrap().as_str(), "doc-2");
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Queued));
    assert_eq!(source.unsubscriptions(), 1);
    assert_eq!(scheduler.cancelled_repeating(), 1);
    assert_eq!(scheduler.repeating_timers(), 1);

    old_sink(PushEvent::Change(ChangeEvent::update("completed")));
    assert_eq!(reconciler.current_state(), Some(LifecycleState::Queued));
    assert!(!reconciler.is_closed());

    scheduler.advance(POLL);
    assert_eq!(source.fetched.lock().last().map(String::as_str), Some("doc-2"));
}

#[test]
fn restart_after_terminal_reopens_channels() {
    let (reconciler, source, scheduler) = harness();
    source.respond("completed");
    block_on(reconciler.start_raw("doc-1"));
    assert!(reconciler.is_closed());

    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    assert!(!reconciler.is_closed());
    assert!(reconciler.is_polling());
    assert!(reconciler.is_subscribed());
    assert_eq!(scheduler.repeating_timers(), 1);
}

#[test]
fn custom_poll_interval_is_used() {
    let source = ScriptedSource::new();
    let scheduler = ManualScheduler::new();
    let config = ReconcilerConfig::builder()
        .poll_interval(Duration::from_secs(5))
        .build();
    let reconciler = Reconciler::with_config(Arc::clone(&source), scheduler.clone(), config);
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));

    scheduler.advance(Duration::from_secs(4));
    assert_eq!(source.fetches(), 1);
    scheduler.advance(Duration::from_secs(1));
    assert_eq!(source.fetches(), 2);
}

#[test]
fn listeners_wake_on_change() {
    let (reconciler, _source, _scheduler) = harness();
    let listener = reconciler.changed();
    reconciler.on_update(StatusReport::new("queued"));
    block_on(listener);
    assert_eq!(reconciler.snapshot().state, Some(LifecycleState::Queued));
}

#[test]
fn clones_share_the_session() {
    let (reconciler, source, _scheduler) = harness();
    let view = reconciler.clone();
    source.respond("processing");
    block_on(reconciler.start_raw("doc-1"));
    assert_eq!(view.current_state(), Some(LifecycleState::Processing));
    view.stop();
    assert!(reconciler.is_closed());
}

mod executor {
    use super::*;
    use executor_core::tokio::TokioGlobal;
    use pdfchat_reconciler::ExecutorScheduler;

    #[tokio::test(flavor = "multi_thread")]
    async fn polls_until_completion_on_a_real_clock() {
        let source = ScriptedSource::new();
        let config = ReconcilerConfig::builder()
            .poll_interval(Duration::from_millis(20))
            .build();
        let reconciler = Reconciler::with_config(
            Arc::clone(&source),
            ExecutorScheduler::new(TokioGlobal),
            config,
        );
        source.respond("processing");
        source.respond("processing");
        source.respond("completed");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        reconciler.start_raw("doc-1").await;
        while !reconciler.is_closed() {
            assert!(std::time::Instant::now() < deadline, "never completed");
            async_io::Timer::after(Duration::from_millis(10)).await;
        }

        assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
        assert!(!reconciler.is_polling());
        assert_eq!(source.fetches(), 3);
        assert_eq!(source.unsubscriptions(), 1);
    }
}
