//! Conversations about a processed document.

use core::fmt::Write as _;

use anyhow::{Result, bail};
use pdfchat_core::{Chat, ChatMessage, ChatReply, DocumentId, LifecycleState, Role, Snapshot};

/// Refuses to chat until the document finished processing.
///
/// # Errors
///
/// Fails unless `snapshot` reports [`LifecycleState::Completed`]. A failed
/// document carries the notification text, which holds the backend's reason.
pub fn ensure_ready(snapshot: &Snapshot) -> Result<()> {
    match snapshot.state {
        Some(LifecycleState::Completed) => Ok(()),
        Some(LifecycleState::Failed) => {
            let reason = snapshot
                .notification
                .as_ref()
                .map_or("processing failed", |n| n.message.as_str());
            bail!("document cannot be chatted with: {reason}")
        }
        Some(state) => bail!(
            "document is still {}; chat opens once processing completes",
            state.as_str()
        ),
        None => bail!("document status is unknown; try again shortly"),
    }
}

/// Message history of one chat about one document.
#[derive(Debug, Clone)]
pub struct Conversation {
    document: DocumentId,
    history: Vec<ChatMessage>,
}

impl Conversation {
    /// Starts an empty conversation about `document`.
    #[must_use]
    pub const fn new(document: DocumentId) -> Self {
        Self {
            document,
            history: Vec::new(),
        }
    }

    /// Messages exchanged so far.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Forgets all messages.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Asks `question` with the full history and records the answer.
    ///
    /// A failed turn leaves the history as it was.
    ///
    /// # Errors
    ///
    /// Propagates the chat collaborator's error.
    pub async fn ask<C: Chat>(&mut self, chat: &C, question: &str) -> Result<ChatReply> {
        self.history.push(ChatMessage::user(question));
        match chat.send(&self.document, &self.history).await {
            Ok(reply) => {
                self.history.push(reply.message.clone());
                Ok(reply)
            }
            Err(err) => {
                self.history.pop();
                Err(err)
            }
        }
    }
}

/// Formats a reply with its numbered sources below.
#[must_use]
pub fn format_reply(reply: &ChatReply) -> String {
    let mut out = reply.message.content.trim().to_owned();
    if !reply.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (index, source) in reply.sources.iter().enumerate() {
            let _ = write!(out, "\n  [{}] {}", index + 1, excerpt(source, 120));
        }
    }
    out
}

/// Formats one history entry for `/history`.
#[must_use]
pub fn format_history_entry(message: &ChatMessage) -> String {
    let role = match message.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
        Role::System => "System",
    };
    format!("  [{role}] {}", excerpt(&message.content, 100))
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
