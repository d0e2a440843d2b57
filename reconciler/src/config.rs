//! Configuration for the reconciler.

use std::time::Duration;

/// Interval between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How long a notification stays visible.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(10);

/// Message shown when the backend reports a failure without detail.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Document processing failed.";

/// Configuration for a [`Reconciler`](crate::Reconciler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Interval of the repeating poll timer, for every entry path.
    pub poll_interval: Duration,
    /// Visibility window of each notification.
    pub notification_ttl: Duration,
    /// Message for `failed` reports that carry no error detail.
    pub failure_fallback_message: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            failure_fallback_message: DEFAULT_FAILURE_MESSAGE.to_owned(),
        }
    }
}

impl ReconcilerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> ReconcilerConfigBuilder {
        ReconcilerConfigBuilder::new()
    }
}

/// Builder for [`ReconcilerConfig`].
#[derive(Debug, Default)]
pub struct ReconcilerConfigBuilder {
    config: ReconcilerConfig,
}

impl ReconcilerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ReconcilerConfig::default(),
        }
    }

    /// Sets the poll interval. Zero is raised to one millisecond.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the notification visibility window.
    #[must_use]
    pub const fn notification_ttl(mut self, ttl: Duration) -> Self {
        self.config.notification_ttl = ttl;
        self
    }

    /// Sets the message used for failures without detail.
    #[must_use]
    pub fn failure_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.config.failure_fallback_message = message.into();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ReconcilerConfig {
        self.config
    }
}
