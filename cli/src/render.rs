//! Terminal rendering of reconciler notifications.
//!
//! Prints one colored line per notification, skipping repeats of the same banner.

use pdfchat_core::{LifecycleState, Notification, Severity};
use time::macros::format_description;

/// Prints notifications as they change.
///
/// A poll that reports the same state again refreshes the banner in the
/// reconciler; on a terminal that would be noise, so a line is only printed when
/// the severity or the message differs from the last printed one.
#[derive(Debug, Clone, Default)]
pub struct NotificationPrinter {
    color: bool,
    last: Option<(Severity, String)>,
}

impl NotificationPrinter {
    /// Creates a printer, with ANSI colors if `color` is set.
    #[must_use]
    pub const fn new(color: bool) -> Self {
        Self { color, last: None }
    }

    /// Returns the line to print for `notification`, or `None` if it repeats the
    /// previous one or there is nothing to show.
    pub fn observe(&mut self, notification: Option<&Notification>) -> Option<String> {
        let notification = notification?;
        let key = (notification.severity, notification.message.clone());
        if self.last.as_ref() == Some(&key) {
            return None;
        }
        self.last = Some(key);
        Some(format_notification(notification, self.color))
    }
}

/// Formats a notification as a single line.
#[must_use]
pub fn format_notification(notification: &Notification, color: bool) -> String {
    let clock = notification
        .emitted_at
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default();
    let (label, code) = match notification.severity {
        Severity::Info => ("info", "36"),
        Severity::Success => ("done", "32"),
        Severity::Error => ("error", "31"),
    };
    if color {
        format!(
            "\x1b[90m{clock}\x1b[0m \x1b[{code}m[{label}]\x1b[0m {}",
            notification.message
        )
    } else {
        format!("{clock} [{label}] {}", notification.message)
    }
}

/// Formats a state for the `status` command.
#[must_use]
pub fn format_state(state: LifecycleState, error_detail: Option<&str>) -> String {
    match (state, error_detail.map(str::trim).filter(|d| !d.is_empty())) {
        (LifecycleState::Failed, Some(detail)) => format!("{state}: {detail}"),
        _ => state.to_string(),
    }
}
