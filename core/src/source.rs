//! Status source collaborator.
//!
//! A [`StatusSource`] answers "what state is this document in?" on demand and,
//! separately, pushes row-level change events for one document. The two channels
//! are independent and may deliver overlapping or out-of-order information.

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::release::Release;
use crate::{DocumentId, StatusReport};

/// Kind of row change carried by a push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    /// The row was created.
    Insert,
    /// The row was modified.
    Update,
    /// The row was removed.
    Delete,
    /// Anything else the channel may emit.
    #[serde(other)]
    Other,
}

impl ChangeType {
    /// Parses the channel's change-type label, case-insensitively.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }
}

/// A row change pushed by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened to the row.
    pub change_type: ChangeType,
    /// New value of the status column, if the event carries one.
    pub new_state: Option<String>,
    /// New value of the error column, if any.
    pub error_detail: Option<String>,
}

impl ChangeEvent {
    /// Creates an update event carrying a new state.
    #[must_use]
    pub fn update(new_state: impl Into<String>) -> Self {
        Self {
            change_type: ChangeType::Update,
            new_state: Some(new_state.into()),
            error_detail: None,
        }
    }

    /// Attaches an error detail.
    #[must_use]
    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    /// Converts the event into the report shape both channels share.
    #[must_use]
    pub fn into_report(self) -> StatusReport {
        StatusReport {
            state: self.new_state,
            error_detail: self.error_detail,
        }
    }
}

/// Everything a subscription can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A change to the subscribed row.
    Change(ChangeEvent),
    /// The push channel failed; no further events should be expected from it.
    ChannelError(String),
}

/// Callback receiving push events.
pub type EventSink = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// Owned handle to an open push subscription.
///
/// Releasing the handle, explicitly through [`Subscription::unsubscribe`] or by
/// dropping it, closes the subscription exactly once.
pub struct Subscription {
    release: Release,
}

impl Subscription {
    /// Wraps the action that closes the underlying channel.
    #[must_use]
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Release::new(unsubscribe),
        }
    }

    /// A subscription with nothing to release.
    #[must_use]
    pub const fn inert() -> Self {
        Self {
            release: Release::noop(),
        }
    }

    /// Closes the subscription.
    pub fn unsubscribe(mut self) {
        self.release.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Source of document status, consumed by the reconciler.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use pdfchat_core::{DocumentId, EventSink, StatusReport, StatusSource, Subscription};
///
/// struct AlwaysReady;
///
/// impl StatusSource for AlwaysReady {
///     async fn fetch_status(&self, _id: &DocumentId) -> pdfchat_core::Result<StatusReport> {
///         Ok(StatusReport::new("completed"))
///     }
///
///     fn subscribe(&self, _id: &DocumentId, _on_event: EventSink) -> pdfchat_core::Result<Subscription> {
///         Ok(Subscription::inert())
///     }
/// }
/// ```
pub trait StatusSource: Send + Sync + 'static {
    /// Fetches the latest known state of a document.
    ///
    /// Fails on transport errors or when the document does not exist.
    fn fetch_status(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = crate::Result<StatusReport>> + Send;

    /// Opens a push subscription for row changes of one document.
    ///
    /// Events may arrive on any thread until the returned handle is released.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be set up at all; failures after
    /// setup are delivered as [`PushEvent::ChannelError`].
    fn subscribe(&self, id: &DocumentId, on_event: EventSink) -> crate::Result<Subscription>;
}

impl<T: StatusSource> StatusSource for Arc<T> {
    fn fetch_status(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = crate::Result<StatusReport>> + Send {
        T::fetch_status(self, id)
    }

    fn subscribe(&self, id: &DocumentId, on_event: EventSink) -> crate::Result<Subscription> {
        T::subscribe(self, id, on_event)
    }
}
