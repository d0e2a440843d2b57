//! Project configuration and endpoint construction.

use std::time::Duration;

use pdfchat_core::DocumentId;
use url::Url;

use crate::error::{Result, SupabaseError};

/// Table holding one row per uploaded document.
pub const DEFAULT_TABLE: &str = "documents";

/// Schema of [`DEFAULT_TABLE`].
pub const DEFAULT_SCHEMA: &str = "public";

/// Interval between two realtime heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Connection settings for a Supabase project.
#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    url: Url,
    anon_key: String,
    table: String,
    schema: String,
    heartbeat_interval: Duration,
}

impl SupabaseConfig {
    /// Creates a configuration for the project at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::InvalidUrl`] if `url` cannot be parsed, or
    /// [`SupabaseError::UnsupportedUrl`] if it cannot carry a path.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url.trim())?;
        if url.cannot_be_a_base() {
            return Err(SupabaseError::UnsupportedUrl(url.into()));
        }
        Ok(Self {
            url,
            anon_key: anon_key.into(),
            table: DEFAULT_TABLE.to_owned(),
            schema: DEFAULT_SCHEMA.to_owned(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        })
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`, falling back to `SUPABASE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::MissingEnv`] if a variable is unset, or
    /// [`SupabaseError::InvalidUrl`] if the URL is malformed.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| SupabaseError::MissingEnv("SUPABASE_URL"))?;
        let key = std::env::var("SUPABASE_ANON_KEY")
            .or_else(|_| std::env::var("SUPABASE_KEY"))
            .map_err(|_| SupabaseError::MissingEnv("SUPABASE_ANON_KEY"))?;
        Self::new(&url, key)
    }

    /// Uses another table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Uses another schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Changes the realtime heartbeat interval. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Project URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Anonymous API key.
    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Documents table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Schema of the documents table.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Realtime heartbeat interval.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// REST endpoint selecting the status columns of one document row.
    #[must_use]
    pub fn status_url(&self, id: &DocumentId) -> Url {
        let mut url = self.endpoint(&["rest", "v1", &self.table]);
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("select", "status,error_message,error");
        url
    }

    /// Realtime websocket endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::UnsupportedUrl`] if the project URL has a scheme with
    /// no websocket counterpart.
    pub fn realtime_url(&self) -> Result<Url> {
        let mut url = self.endpoint(&["realtime", "v1", "websocket"]);
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            _ => return Err(SupabaseError::UnsupportedUrl(self.url.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|()| SupabaseError::UnsupportedUrl(self.url.to_string()))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    /// Realtime topic scoped to one document row.
    #[must_use]
    pub fn topic(&self, id: &DocumentId) -> String {
        format!("realtime:{}:{}:id=eq.{id}", self.schema, self.table)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl core::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"<redacted>")
            .field("table", &self.table)
            .field("schema", &self.schema)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish()
    }
}
