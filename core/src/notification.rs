//! User-facing notifications.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::LifecycleState;

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress information.
    Info,
    /// The document became usable.
    Success,
    /// Something went wrong.
    Error,
}

/// A single banner message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Presentation severity.
    pub severity: Severity,
    /// Human-readable text.
    pub message: String,
    /// When the notification was emitted.
    #[serde(with = "time::serde::rfc3339")]
    pub emitted_at: OffsetDateTime,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>, emitted_at: OffsetDateTime) -> Self {
        Self {
            severity,
            message: message.into(),
            emitted_at,
        }
    }

    /// Whether this is an error banner.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

/// Read-only view of everything a UI needs to render a document's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current lifecycle state, `None` until the first update is accepted.
    pub state: Option<LifecycleState>,
    /// The active notification, if any.
    pub notification: Option<Notification>,
    /// When the state was last updated.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated_at: Option<OffsetDateTime>,
}

impl Snapshot {
    /// Whether the snapshot reflects a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(LifecycleState::is_terminal)
    }
}
