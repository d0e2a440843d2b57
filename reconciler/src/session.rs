//! Per-document session state.
//!
//! The session owns the three background resources of a reconciliation (poll timer,
//! push subscription, notification expiry) as RAII handles. Every mutation that
//! gives a resource up returns it inside [`Released`], so the caller can drop it
//! after the session lock is gone.

use pdfchat_core::{
    DocumentId, LifecycleState, Notification, OffsetDateTime, Snapshot, StatusUpdate,
    Subscription, TimerHandle,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Never started; direct updates are still accepted.
    Idle,
    /// Started and not yet terminal or stopped.
    Active,
    /// Terminal state reached or stopped; all channel input is ignored.
    Closed,
}

#[derive(Debug)]
pub(crate) struct Session {
    epoch: u64,
    phase: Phase,
    document_id: Option<DocumentId>,
    state: Option<LifecycleState>,
    last_updated_at: Option<OffsetDateTime>,
    notification: Option<Notification>,
    notification_serial: u64,
    notification_expiry: Option<TimerHandle>,
    poll: Option<TimerHandle>,
    subscription: Option<Subscription>,
}

impl Session {
    pub(crate) const fn new() -> Self {
        Self {
            epoch: 0,
            phase: Phase::Idle,
            document_id: None,
            state: None,
            last_updated_at: None,
            notification: None,
            notification_serial: 0,
            notification_expiry: None,
            poll: None,
            subscription: None,
        }
    }

    /// Re-initializes the session for `id` and returns the epoch of the new session.
    pub(crate) fn begin(&mut self, id: DocumentId, released: &mut Released) -> u64 {
        released.take_all(self);
        self.epoch += 1;
        self.phase = Phase::Active;
        self.document_id = Some(id);
        self.state = None;
        self.last_updated_at = None;
        self.notification = None;
        self.epoch
    }

    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) const fn document_id(&self) -> Option<&DocumentId> {
        self.document_id.as_ref()
    }

    pub(crate) const fn state(&self) -> Option<LifecycleState> {
        self.state
    }

    pub(crate) const fn last_updated_at(&self) -> Option<OffsetDateTime> {
        self.last_updated_at
    }

    pub(crate) const fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub(crate) const fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    pub(crate) const fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Whether input from the channel of `epoch` may mutate the session.
    ///
    /// `None` stands for a direct caller, which always targets the current session.
    pub(crate) fn accepts(&self, epoch: Option<u64>) -> bool {
        self.phase != Phase::Closed && epoch.is_none_or(|epoch| epoch == self.epoch)
    }

    /// Whether a poll timer should be armed for the current session.
    pub(crate) fn needs_poll(&self) -> bool {
        self.phase != Phase::Closed
            && self.poll.is_none()
            && self.document_id.is_some()
            && !self.state.is_some_and(LifecycleState::is_terminal)
    }

    pub(crate) fn record(&mut self, update: &StatusUpdate) {
        self.state = Some(update.state);
        self.last_updated_at = Some(update.observed_at);
    }

    pub(crate) fn set_poll(&mut self, handle: TimerHandle) {
        self.poll = Some(handle);
    }

    /// Stores the subscription, or hands it back if the session moved on meanwhile.
    pub(crate) fn set_subscription(
        &mut self,
        epoch: u64,
        subscription: Subscription,
    ) -> Option<Subscription> {
        if self.accepts(Some(epoch)) {
            self.subscription = Some(subscription);
            None
        } else {
            Some(subscription)
        }
    }

    /// Replaces the notification and returns its serial for expiry bookkeeping.
    pub(crate) fn show(&mut self, notification: Notification, released: &mut Released) -> u64 {
        released.expiry = self.notification_expiry.take();
        self.notification_serial += 1;
        self.notification = Some(notification);
        self.notification_serial
    }

    pub(crate) fn set_expiry(&mut self, serial: u64, handle: TimerHandle) -> Option<TimerHandle> {
        if serial == self.notification_serial && self.notification.is_some() {
            self.notification_expiry = Some(handle);
            None
        } else {
            Some(handle)
        }
    }

    /// Clears the notification if it is still the one numbered `serial`.
    pub(crate) fn expire(&mut self, epoch: u64, serial: u64, released: &mut Released) -> bool {
        if epoch != self.epoch || serial != self.notification_serial {
            return false;
        }
        self.dismiss(released)
    }

    pub(crate) fn dismiss(&mut self, released: &mut Released) -> bool {
        released.expiry = self.notification_expiry.take();
        self.notification.take().is_some()
    }

    /// Terminal teardown: the poll timer goes first, then the subscription.
    pub(crate) fn close(&mut self, released: &mut Released) {
        self.phase = Phase::Closed;
        released.poll = self.poll.take();
        released.subscription = self.subscription.take();
    }

    /// Explicit teardown of both channels.
    ///
    /// The notification stays up until its expiry timer, a dismissal or a restart.
    pub(crate) fn stop(&mut self, released: &mut Released) {
        self.close(released);
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            notification: self.notification.clone(),
            last_updated_at: self.last_updated_at,
        }
    }
}

/// Resources taken out of a session, released once the session lock is dropped.
#[derive(Debug, Default)]
pub(crate) struct Released {
    poll: Option<TimerHandle>,
    subscription: Option<Subscription>,
    expiry: Option<TimerHandle>,
}

impl Released {
    fn take_all(&mut self, session: &mut Session) {
        self.poll = session.poll.take();
        self.subscription = session.subscription.take();
        self.expiry = session.notification_expiry.take();
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.poll.is_none() && self.subscription.is_none() && self.expiry.is_none()
    }

    /// Cancels the poll timer, then closes the subscription, then the expiry timer.
    pub(crate) fn release(self) {
        if let Some(poll) = self.poll {
            poll.cancel();
            debug!("poll timer cancelled");
        }
        if let Some(subscription) = self.subscription {
            subscription.unsubscribe();
            debug!("push subscription released");
        }
        if let Some(expiry) = self.expiry {
            expiry.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    fn counting_timer(counter: &Arc<AtomicUsize>) -> TimerHandle {
        let counter = Arc::clone(counter);
        TimerHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn counting_subscription(counter: &Arc<AtomicUsize>) -> Subscription {
        let counter = Arc::clone(counter);
        Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn doc() -> DocumentId {
        DocumentId::parse("doc-1").unwrap()
    }

    #[test]
    fn begin_bumps_epoch_and_resets_state() {
        let mut session = Session::new();
        let mut released = Released::default();
        let first = session.begin(doc(), &mut released);
        session.record(&StatusUpdate {
            state: LifecycleState::Processing,
            error_detail: None,
            observed_at: datetime!(2024-03-01 12:00 UTC),
        });
        let second = session.begin(doc(), &mut released);

        assert_eq!(second, first + 1);
        assert_eq!(session.state(), None);
        assert_eq!(session.last_updated_at(), None);
        assert!(!session.accepts(Some(first)));
        assert!(session.accepts(Some(second)));
        assert!(session.accepts(None));
    }

    #[test]
    fn close_releases_poll_and_subscription() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let unsubscribed = Arc::new(AtomicUsize::new(0));
        let mut session = Session::new();
        let mut released = Released::default();
        let epoch = session.begin(doc(), &mut released);
        session.set_poll(counting_timer(&cancelled));
        assert!(
            session
                .set_subscription(epoch, counting_subscription(&unsubscribed))
                .is_none()
        );

        let mut released = Released::default();
        session.close(&mut released);
        assert!(session.is_closed());
        assert!(!session.is_polling());
        assert!(!session.is_subscribed());
        released.release();

        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(unsubscribed.load(Ordering::SeqCst), 1);
        assert!(!session.accepts(None));
    }

    #[test]
    fn stale_subscription_is_handed_back() {
        let mut session = Session::new();
        let mut released = Released::default();
        let old = session.begin(doc(), &mut released);
        session.begin(doc(), &mut released);
        assert!(
            session
                .set_subscription(old, Subscription::inert())
                .is_some()
        );
    }

    #[test]
    fn expiry_only_clears_matching_notification() {
        let mut session = Session::new();
        let mut released = Released::default();
        let epoch = session.begin(doc(), &mut released);
        let at = datetime!(2024-03-01 12:00 UTC);

        let first = session.show(
            Notification::new(pdfchat_core::Severity::Info, "first", at),
            &mut released,
        );
        let second = session.show(
            Notification::new(pdfchat_core::Severity::Info, "second", at),
            &mut released,
        );

        assert!(!session.expire(epoch, first, &mut released));
        assert_eq!(session.notification().unwrap().message, "second");
        assert!(session.expire(epoch, second, &mut released));
        assert!(session.notification().is_none());
    }

    #[test]
    fn needs_poll_respects_terminal_state() {
        let mut session = Session::new();
        assert!(!session.needs_poll());

        let mut released = Released::default();
        session.begin(doc(), &mut released);
        assert!(session.needs_poll());

        session.record(&StatusUpdate {
            state: LifecycleState::Completed,
            error_detail: None,
            observed_at: datetime!(2024-03-01 12:00 UTC),
        });
        assert!(!session.needs_poll());
    }
}
