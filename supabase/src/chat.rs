//! Chat through the backend API.

use pdfchat_core::{Chat, ChatMessage, ChatReply, DocumentId};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::api;
use crate::error::Result;
use crate::rest::successful_body;

/// Asks the backend about a processed document.
///
/// Each turn is a `POST {base}/api/v1/chat` carrying the document id and the
/// whole conversation. The backend retrieves matching chunks of the document,
/// answers from them and returns the passages as sources.
#[derive(Debug, Clone)]
pub struct BackendChat {
    base: Url,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    document_id: &'a DocumentId,
    messages: &'a [ChatMessage],
}

impl BackendChat {
    /// Creates a chat client for the API at `base`.
    ///
    /// # Errors
    ///
    /// Fails if `base` cannot be parsed or cannot carry a path.
    pub fn new(base: &str) -> Result<Self> {
        Self::with_client(base, reqwest::Client::new())
    }

    /// Creates a chat client sharing an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if `base` cannot be parsed or cannot carry a path.
    pub fn with_client(base: &str, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base: api::parse_base(base)?,
            http,
        })
    }

    /// The chat endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Url {
        api::endpoint(&self.base, ["chat"])
    }

    /// Sends one chat turn.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success responses and undecodable bodies.
    pub async fn ask(&self, document: &DocumentId, messages: &[ChatMessage]) -> Result<ChatReply> {
        debug!(document = %document, turns = messages.len(), "sending chat turn");
        let response = self
            .http
            .post(self.endpoint())
            .json(&ChatPayload {
                document_id: document,
                messages,
            })
            .send()
            .await?;
        let reply: ChatReply = serde_json::from_str(&successful_body(response).await?)?;
        info!(document = %document, sources = reply.sources.len(), "chat reply received");
        Ok(reply)
    }
}

impl Chat for BackendChat {
    async fn send(
        &self,
        document: &DocumentId,
        messages: &[ChatMessage],
    ) -> pdfchat_core::Result<ChatReply> {
        Ok(self.ask(document, messages).await?)
    }
}
