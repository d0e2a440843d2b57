//! Command-line client for pdfchat document processing.
//!
//! This crate provides the `pdfchat` binary, which uploads PDFs to the backend
//! and follows their processing through the status reconciler.
//!
//! # Features
//!
//! - Upload a local file or a link
//! - Watch a document until it completes or fails
//! - One-shot status lookup
//! - Chat with a document once it is processed
//!
//! # Usage
//!
//! ```bash
//! SUPABASE_URL=https://xyz.supabase.co SUPABASE_ANON_KEY=xxx cargo run -p pdfchat-cli -- watch <DOCUMENT_ID>
//! ```

mod chat;
mod input;
mod render;

pub use chat::{Conversation, ensure_ready, format_history_entry, format_reply};
pub use input::{expand_tilde, file_source, is_pdf, link_source};
pub use render::{NotificationPrinter, format_notification, format_state};
