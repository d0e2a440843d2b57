//! Document identity and lifecycle.
//!
//! The backend records every uploaded PDF as a row whose `status` column moves
//! through [`LifecycleState`]. Both status channels report that column as a raw
//! string; [`StatusReport::parse_state`] turns it into a typed state.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opaque identifier of an uploaded document.
///
/// Never empty: use [`DocumentId::parse`] to build one from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Builds an identifier, rejecting empty or whitespace-only input.
    #[must_use]
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Processing stage of a document, mirrored from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// The file is still being transferred.
    Uploading,
    /// The row exists and a processing job is waiting.
    Queued,
    /// Extraction, chunking and embedding are running.
    Processing,
    /// The document is indexed and ready for chat.
    Completed,
    /// Processing ended with an error.
    Failed,
}

impl LifecycleState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Uploading,
        Self::Queued,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    /// Whether no further transitions are expected after this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lowercase name as stored by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw status string could not be mapped to a [`LifecycleState`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseStateError {
    /// The report carried no state at all.
    #[error("status report carries no state")]
    Missing,
    /// The report carried a value outside the lifecycle set.
    #[error("unrecognized document state: {0:?}")]
    Unrecognized(String),
}

impl FromStr for LifecycleState {
    type Err = ParseStateError;

    /// Case-insensitive; also accepts the aliases the backend writes
    /// (`pending`, `ready`, `processed`, `error`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" => Err(ParseStateError::Missing),
            "uploading" => Ok(Self::Uploading),
            "queued" | "pending" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" | "ready" | "processed" => Ok(Self::Completed),
            "failed" | "error" => Ok(Self::Failed),
            _ => Err(ParseStateError::Unrecognized(s.to_owned())),
        }
    }
}

/// Raw status as reported by either channel, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Reported state, exactly as the source spelled it.
    pub state: Option<String>,
    /// Error detail attached to the row, if any.
    pub error_detail: Option<String>,
}

impl StatusReport {
    /// Creates a report for the given raw state.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            error_detail: None,
        }
    }

    /// Creates a report that carries no state.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            state: None,
            error_detail: None,
        }
    }

    /// Attaches an error detail.
    #[must_use]
    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    /// Normalizes the reported state.
    ///
    /// # Errors
    ///
    /// Returns [`ParseStateError`] if no state is present or it is not a lifecycle state.
    pub fn parse_state(&self) -> Result<LifecycleState, ParseStateError> {
        self.state
            .as_deref()
            .ok_or(ParseStateError::Missing)?
            .parse()
    }
}

/// A normalized, accepted status fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Lifecycle state after normalization.
    pub state: LifecycleState,
    /// Error detail, only meaningful for [`LifecycleState::Failed`].
    pub error_detail: Option<String>,
    /// Arrival time of the update on this client.
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_rejects_blank_input() {
        assert!(DocumentId::parse("").is_none());
        assert!(DocumentId::parse("   ").is_none());
        assert_eq!(DocumentId::parse(" doc-1 ").unwrap().as_str(), "doc-1");
    }

    #[test]
    fn states_parse_case_insensitively() {
        for state in LifecycleState::ALL {
            let upper = state.as_str().to_ascii_uppercase();
            assert_eq!(upper.parse::<LifecycleState>(), Ok(state));
        }
        assert_eq!("Processing".parse(), Ok(LifecycleState::Processing));
    }

    #[test]
    fn backend_aliases_are_accepted() {
        assert_eq!("pending".parse(), Ok(LifecycleState::Queued));
        assert_eq!("ready".parse(), Ok(LifecycleState::Completed));
        assert_eq!("processed".parse(), Ok(LifecycleState::Completed));
        assert_eq!("ERROR".parse(), Ok(LifecycleState::Failed));
    }

    #[test]
    fn unknown_and_missing_states_are_rejected() {
        assert_eq!(
            "archived".parse::<LifecycleState>(),
            Err(ParseStateError::Unrecognized("archived".to_owned()))
        );
        assert_eq!(
            StatusReport::empty().parse_state(),
            Err(ParseStateError::Missing)
        );
        assert_eq!(
            StatusReport::new("  ").parse_state(),
            Err(ParseStateError::Missing)
        );
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        let terminal: Vec<_> = LifecycleState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![LifecycleState::Completed, LifecycleState::Failed]
        );
    }

    #[test]
    fn report_deserializes_from_json() {
        let report: StatusReport =
            serde_json::from_str(r#"{"state":"failed","error_detail":"no text"}"#).unwrap();
        assert_eq!(report.parse_state(), Ok(LifecycleState::Failed));
        assert_eq!(report.error_detail.as_deref(), Some("no text"));
    }
}
