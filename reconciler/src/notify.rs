//! Notification derivation.
//!
//! Every accepted update produces exactly one notification, including repeated
//! reports of the same state, so a "still processing" event refreshes the banner.

use pdfchat_core::{LifecycleState, Notification, OffsetDateTime, Severity, StatusUpdate};

use crate::config::ReconcilerConfig;

/// Banner texts shown by the reconciler.
pub mod messages {
    /// Shown while the file is transferred.
    pub const UPLOADING: &str = "Uploading document…";
    /// Shown while the job waits in the backend queue.
    pub const QUEUED: &str = "Document queued for processing…";
    /// Shown while the document is extracted and embedded.
    pub const PROCESSING: &str = "Document is being processed. This may take a few moments…";
    /// Shown once the document can be chatted with.
    pub const COMPLETED: &str =
        "Document processing completed! You can now chat with your document.";
    /// Shown when a poll fails.
    pub const FETCH_FAILED: &str = "Error checking document status…";
    /// Shown when the push channel cannot be used.
    pub const SUBSCRIPTION_FAILED: &str =
        "Error subscribing to document updates. Falling back to polling…";
}

/// Notification for an accepted state change.
pub(crate) fn for_update(update: &StatusUpdate, config: &ReconcilerConfig) -> Notification {
    let (severity, message) = match update.state {
        LifecycleState::Uploading => (Severity::Info, messages::UPLOADING.to_owned()),
        LifecycleState::Queued => (Severity::Info, messages::QUEUED.to_owned()),
        LifecycleState::Processing => (Severity::Info, messages::PROCESSING.to_owned()),
        LifecycleState::Completed => (Severity::Success, messages::COMPLETED.to_owned()),
        LifecycleState::Failed => (
            Severity::Error,
            update
                .error_detail
                .as_deref()
                .map(str::trim)
                .filter(|detail| !detail.is_empty())
                .map_or_else(|| config.failure_fallback_message.clone(), str::to_owned),
        ),
    };
    Notification::new(severity, message, update.observed_at)
}

pub(crate) fn fetch_failed(now: OffsetDateTime) -> Notification {
    Notification::new(Severity::Error, messages::FETCH_FAILED, now)
}

pub(crate) fn subscription_failed(now: OffsetDateTime) -> Notification {
    Notification::new(Severity::Error, messages::SUBSCRIPTION_FAILED, now)
}
