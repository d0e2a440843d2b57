//! Error types for the reconciler.
//!
//! None of these reach the caller: they classify channel failures for logging
//! and decide which notification, if any, the user sees.

use core::fmt;

use pdfchat_core::ParseStateError;
use thiserror::Error;

/// Channel an update arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The repeating poll timer, or the initial fetch of `start`.
    Poll,
    /// The push subscription.
    Push,
    /// A caller invoking `on_update` directly.
    Direct,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Poll => "poll",
            Self::Push => "push",
            Self::Direct => "direct",
        })
    }
}

/// Failures observed while reconciling a document's status.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A channel delivered a state outside the lifecycle set. Logged only.
    #[error("unrecognized status from {channel} channel: {source}")]
    UnrecognizedState {
        /// Channel that delivered the value.
        channel: Channel,
        /// Parse failure.
        #[source]
        source: ParseStateError,
    },

    /// The status source could not be queried.
    #[error("status fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),

    /// The push subscription could not be opened.
    #[error("subscription failed: {0}")]
    Subscribe(#[source] anyhow::Error),

    /// The push channel failed after it was opened.
    #[error("push channel failed: {0}")]
    Channel(String),
}

impl ReconcileError {
    /// Whether the user should see an error notification for this failure.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self, Self::UnrecognizedState { .. })
    }
}
