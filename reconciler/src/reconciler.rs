//! The status reconciler.

use std::sync::{Arc, Weak};

use event_listener::{Event, EventListener};
use futures_lite::future::Boxed;
use parking_lot::Mutex;
use pdfchat_core::{
    DocumentId, EventSink, LifecycleState, Notification, OffsetDateTime, PushEvent, Scheduler,
    Snapshot, StatusReport, StatusSource, StatusUpdate, Tick,
};
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{Channel, ReconcileError};
use crate::notify;
use crate::session::{Released, Session};

/// Tracks one document's lifecycle from a poll channel and a push channel.
///
/// The reconciler is a cheap handle; clones share the same session. Its status
/// source and scheduler are injected, never looked up globally.
///
/// Updates are merged last-write-wins by arrival. Each merge runs under the session
/// lock without awaiting, so poll ticks and push events interleave only between
/// complete updates. Once a terminal state is accepted, the poll timer and the
/// subscription are released and later input is ignored.
///
/// # Example
///
/// ```rust
/// use pdfchat_core::{DocumentId, EventSink, LifecycleState, StatusReport, StatusSource, Subscription};
/// use pdfchat_reconciler::{ManualScheduler, Reconciler};
///
/// struct Done;
///
/// impl StatusSource for Done {
///     async fn fetch_status(&self, _id: &DocumentId) -> pdfchat_core::Result<StatusReport> {
///         Ok(StatusReport::new("completed"))
///     }
///
///     fn subscribe(&self, _id: &DocumentId, _on_event: EventSink) -> pdfchat_core::Result<Subscription> {
///         Ok(Subscription::inert())
///     }
/// }
///
/// let reconciler = Reconciler::new(Done, ManualScheduler::new());
/// futures_lite::future::block_on(reconciler.start_raw("doc-1"));
/// assert_eq!(reconciler.current_state(), Some(LifecycleState::Completed));
/// assert!(!reconciler.is_polling());
/// ```
pub struct Reconciler<S, C> {
    inner: Arc<Inner<S, C>>,
}

impl<S, C> Clone for Reconciler<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C> core::fmt::Debug for Reconciler<S, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reconciler")
            .field("session", &*self.inner.session.lock())
            .finish_non_exhaustive()
    }
}

struct Inner<S, C> {
    source: S,
    scheduler: C,
    config: ReconcilerConfig,
    session: Mutex<Session>,
    changed: Event,
}

impl<S, C> Reconciler<S, C>
where
    S: StatusSource,
    C: Scheduler,
{
    /// Creates a reconciler with the default configuration.
    pub fn new(source: S, scheduler: C) -> Self {
        Self::with_config(source, scheduler, ReconcilerConfig::default())
    }

    /// Creates a reconciler with a custom configuration.
    pub fn with_config(source: S, scheduler: C, config: ReconcilerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                scheduler,
                config,
                session: Mutex::new(Session::new()),
                changed: Event::new(),
            }),
        }
    }

    /// Starts reconciling `id`. Does nothing when `id` is `None`.
    ///
    /// Re-initializes the session, fetches the current status once, opens the push
    /// subscription and arms the poll timer. Neither channel is opened if the first
    /// fetch already reports a terminal state.
    pub async fn start(&self, id: Option<DocumentId>) {
        let Some(id) = id else {
            debug!("no document id, reconciliation not started");
            return;
        };
        let inner = &self.inner;
        let epoch = inner.begin(&id);
        info!(document = %id, epoch, "reconciling document status");

        let fetched = inner.source.fetch_status(&id).await;
        inner.apply_fetch(epoch, fetched);

        inner.open_subscription(epoch, &id);

        let mut session = inner.session.lock();
        if session.accepts(Some(epoch)) && session.needs_poll() {
            inner.arm_poll(&mut session);
        }
    }

    /// Starts reconciling the document named by `raw`, ignoring blank input.
    pub async fn start_raw(&self, raw: &str) {
        self.start(DocumentId::parse(raw)).await;
    }

    /// Binds a fresh session to `id` without fetching or subscribing.
    ///
    /// For callers that already know the state, such as an upload acknowledgment,
    /// and feed it through [`on_update`](Self::on_update). The first non-terminal
    /// update then arms the poll timer, which keeps the state current from there.
    pub fn bind(&self, id: DocumentId) {
        let epoch = self.inner.begin(&id);
        debug!(document = %id, epoch, "session bound without fetching");
    }

    /// Merges a raw status report into the session.
    ///
    /// Both channels end up here; callers that already know the state may invoke it
    /// directly. Unrecognized states are logged and dropped. A non-terminal update
    /// arms the poll timer if none is armed and a document is bound, so a session
    /// set up through [`bind`](Self::bind) starts polling on its first update.
    pub fn on_update(&self, report: StatusReport) {
        self.inner.apply_report(None, report, Channel::Direct);
    }

    /// Releases the poll timer and the subscription.
    ///
    /// Idempotent. Ticks or events already in flight are ignored afterwards. The
    /// current notification is left to its expiry timer or a dismissal.
    pub fn stop(&self) {
        let mut released = Released::default();
        self.inner.session.lock().stop(&mut released);
        if !released.is_empty() {
            info!("reconciliation stopped");
        }
        released.release();
    }

    /// Clears the current notification before its visibility window ends.
    pub fn dismiss_notification(&self) {
        let mut released = Released::default();
        let cleared = self.inner.session.lock().dismiss(&mut released);
        released.release();
        if cleared {
            self.inner.changed.notify(usize::MAX);
        }
    }

    /// Current lifecycle state, `None` until an update has been accepted.
    #[must_use]
    pub fn current_state(&self) -> Option<LifecycleState> {
        self.inner.session.lock().state()
    }

    /// The notification currently shown, if any.
    #[must_use]
    pub fn current_notification(&self) -> Option<Notification> {
        self.inner.session.lock().notification().cloned()
    }

    /// When the state was last updated.
    #[must_use]
    pub fn last_updated_at(&self) -> Option<OffsetDateTime> {
        self.inner.session.lock().last_updated_at()
    }

    /// State, notification and update time, read atomically.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.session.lock().snapshot()
    }

    /// Document of the current session.
    #[must_use]
    pub fn document_id(&self) -> Option<DocumentId> {
        self.inner.session.lock().document_id().cloned()
    }

    /// Whether a poll timer is armed.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.session.lock().is_polling()
    }

    /// Whether a push subscription is held.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.session.lock().is_subscribed()
    }

    /// Whether the session stopped accepting updates.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.session.lock().is_closed()
    }

    /// Resolves after the next change of the [`Snapshot`].
    ///
    /// Create the listener before reading the snapshot so no change is missed.
    #[must_use]
    pub fn changed(&self) -> EventListener {
        self.inner.changed.listen()
    }
}

impl<S, C> Inner<S, C>
where
    S: StatusSource,
    C: Scheduler,
{
    /// Re-initializes the session for `id` and returns its epoch.
    fn begin(&self, id: &DocumentId) -> u64 {
        let mut released = Released::default();
        let epoch = self.session.lock().begin(id.clone(), &mut released);
        released.release();
        self.changed.notify(usize::MAX);
        epoch
    }

    fn apply_fetch(self: &Arc<Self>, epoch: u64, fetched: pdfchat_core::Result<StatusReport>) {
        match fetched {
            Ok(report) => self.apply_report(Some(epoch), report, Channel::Poll),
            Err(err) => self.report_failure(epoch, ReconcileError::Fetch(err)),
        }
    }

    fn apply_report(self: &Arc<Self>, epoch: Option<u64>, report: StatusReport, channel: Channel) {
        let mut released = Released::default();
        {
            let mut session = self.session.lock();
            if !session.accepts(epoch) {
                debug!(%channel, "session closed, update ignored");
                return;
            }
            let state = match report.parse_state() {
                Ok(state) => state,
                Err(source) => {
                    let err = ReconcileError::UnrecognizedState { channel, source };
                    warn!(error = %err, "discarding status update");
                    return;
                }
            };

            let update = StatusUpdate {
                state,
                error_detail: report.error_detail,
                observed_at: self.scheduler.now(),
            };
            debug!(%channel, state = %update.state, "status update accepted");
            session.record(&update);
            let notification = notify::for_update(&update, &self.config);
            self.show(&mut session, notification, &mut released);

            if state.is_terminal() {
                session.close(&mut released);
                info!(state = %state, "document reached a terminal state");
            } else if session.needs_poll() {
                self.arm_poll(&mut session);
            }
        }
        released.release();
        self.changed.notify(usize::MAX);
    }

    fn report_failure(self: &Arc<Self>, epoch: u64, err: ReconcileError) {
        let mut released = Released::default();
        {
            let mut session = self.session.lock();
            if !session.accepts(Some(epoch)) {
                debug!(error = %err, "session closed, failure ignored");
                return;
            }
            warn!(error = %err, "document status channel failed");
            if !err.is_user_visible() {
                return;
            }
            let now = self.scheduler.now();
            let notification = match err {
                ReconcileError::Fetch(_) => notify::fetch_failed(now),
                _ => notify::subscription_failed(now),
            };
            self.show(&mut session, notification, &mut released);
        }
        released.release();
        self.changed.notify(usize::MAX);
    }

    fn on_push(self: &Arc<Self>, epoch: u64, event: PushEvent) {
        match event {
            PushEvent::Change(change) => {
                self.apply_report(Some(epoch), change.into_report(), Channel::Push);
            }
            PushEvent::ChannelError(message) => {
                self.report_failure(epoch, ReconcileError::Channel(message));
            }
        }
    }

    fn open_subscription(self: &Arc<Self>, epoch: u64, id: &DocumentId) {
        if !self.session.lock().accepts(Some(epoch)) {
            return;
        }

        let weak = Arc::downgrade(self);
        let sink: EventSink = Arc::new(move |event: PushEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_push(epoch, event);
            }
        });

        match self.source.subscribe(id, sink) {
            Ok(subscription) => {
                let stale = self.session.lock().set_subscription(epoch, subscription);
                if let Some(stale) = stale {
                    debug!("session moved on while subscribing");
                    stale.unsubscribe();
                } else {
                    debug!(document = %id, "push subscription opened");
                }
            }
            Err(err) => self.report_failure(epoch, ReconcileError::Subscribe(err)),
        }
    }

    fn arm_poll(self: &Arc<Self>, session: &mut Session) {
        let Some(id) = session.document_id().cloned() else {
            return;
        };
        let epoch = session.epoch();
        let weak = Arc::downgrade(self);
        let tick: Tick = Box::new(move || -> Boxed<()> {
            let weak: Weak<Self> = weak.clone();
            let id = id.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.session.lock().accepts(Some(epoch)) {
                    return;
                }
                let fetched = inner.source.fetch_status(&id).await;
                inner.apply_fetch(epoch, fetched);
            })
        });
        session.set_poll(self.scheduler.repeat(self.config.poll_interval, tick));
        debug!(interval = ?self.config.poll_interval, "poll timer armed");
    }

    fn show(self: &Arc<Self>, session: &mut Session, notification: Notification, released: &mut Released) {
        let serial = session.show(notification, released);
        let epoch = session.epoch();
        let weak = Arc::downgrade(self);
        let handle = self.scheduler.once(
            self.config.notification_ttl,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.expire(epoch, serial);
                }
            }),
        );
        if let Some(unused) = session.set_expiry(serial, handle) {
            unused.cancel();
        }
    }

    fn expire(&self, epoch: u64, serial: u64) {
        let mut released = Released::default();
        let cleared = self.session.lock().expire(epoch, serial, &mut released);
        released.release();
        if cleared {
            debug!("notification expired");
            self.changed.notify(usize::MAX);
        }
    }
}
