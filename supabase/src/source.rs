//! [`StatusSource`] backed by a Supabase project.

use std::sync::Arc;

use executor_core::{Executor, Task};
use pdfchat_core::{DocumentId, EventSink, StatusReport, StatusSource, Subscription};
use tracing::debug;

use crate::config::SupabaseConfig;
use crate::{realtime, rest};

/// Reads document status from the `documents` table and subscribes to its row
/// changes through Realtime.
///
/// Each subscription runs as a detached task on `executor` and holds its own
/// websocket. The task must be able to use tokio's networking, so pass
/// `executor_core::tokio::TokioGlobal` or another executor living inside a tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct SupabaseStatusSource<E> {
    config: Arc<SupabaseConfig>,
    http: reqwest::Client,
    executor: E,
}

impl<E> SupabaseStatusSource<E>
where
    E: Executor + Clone + Send + Sync + 'static,
{
    /// Creates a source with a fresh HTTP client.
    pub fn new(config: SupabaseConfig, executor: E) -> Self {
        Self::with_client(config, reqwest::Client::new(), executor)
    }

    /// Creates a source sharing an existing HTTP client.
    pub fn with_client(config: SupabaseConfig, http: reqwest::Client, executor: E) -> Self {
        Self {
            config: Arc::new(config),
            http,
            executor,
        }
    }

    /// The project configuration.
    #[must_use]
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }
}

impl<E> StatusSource for SupabaseStatusSource<E>
where
    E: Executor + Clone + Send + Sync + 'static,
{
    async fn fetch_status(&self, id: &DocumentId) -> pdfchat_core::Result<StatusReport> {
        Ok(rest::fetch_status(&self.http, &self.config, id).await?)
    }

    fn subscribe(&self, id: &DocumentId, on_event: EventSink) -> pdfchat_core::Result<Subscription> {
        self.config.realtime_url()?;

        let (stop_tx, stop_rx) = async_channel::bounded::<()>(1);
        self.executor
            .spawn(realtime::run(
                Arc::clone(&self.config),
                id.clone(),
                on_event,
                stop_rx,
            ))
            .detach();
        debug!(document = %id, "realtime subscription started");

        Ok(Subscription::new(move || {
            stop_tx.close();
        }))
    }
}
