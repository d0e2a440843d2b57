//! Chat transport contract.
//!
//! A chat turn sends the conversation so far together with the document it is
//! about, and receives the assistant's answer plus the passages it drew on.

use core::fmt;
use core::future::Future;

use serde::{Deserialize, Serialize};

use crate::DocumentId;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking about the document.
    User,
    /// The model answering from the document.
    Assistant,
    /// Instructions framing the conversation.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        })
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Answer to a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The assistant's message.
    pub message: ChatMessage,
    /// Document passages the answer was grounded on.
    #[serde(default, alias = "context_documents")]
    pub sources: Vec<String>,
}

/// Asks questions about a processed document.
pub trait Chat: Send + Sync {
    /// Sends `messages` about `document` and returns the assistant's reply.
    fn send(
        &self,
        document: &DocumentId,
        messages: &[ChatMessage],
    ) -> impl Future<Output = crate::Result<ChatReply>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_lowercase_on_the_wire() {
        let encoded = serde_json::to_string(&ChatMessage::user("What is attention?")).unwrap();
        assert_eq!(encoded, r#"{"role":"user","content":"What is attention?"}"#);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn reply_accepts_backend_context_documents() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":"Self-attention."},"context_documents":["p. 3"],"status":"success"}"#,
        )
        .unwrap();
        assert_eq!(reply.message, ChatMessage::assistant("Self-attention."));
        assert_eq!(reply.sources, vec!["p. 3".to_owned()]);
    }

    #[test]
    fn reply_without_sources() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":"No."}}"#).unwrap();
        assert!(reply.sources.is_empty());
    }
}
