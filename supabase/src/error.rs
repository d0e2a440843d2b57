//! Error types for the Supabase collaborators.

use thiserror::Error;

/// Errors raised while talking to Supabase or the backend API.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// A configured or derived URL is malformed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A URL has a shape or scheme the client cannot use.
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    /// The HTTP request could not be performed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail extracted from the body, or the raw body.
        message: String,
    },

    /// A payload could not be decoded.
    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// No row exists for the requested document.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The websocket transport failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The realtime server refused to join the channel.
    #[error("channel join rejected: {0}")]
    JoinRejected(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for SupabaseError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

/// Result type alias for Supabase operations.
pub type Result<T> = std::result::Result<T, SupabaseError>;
