//! # pdfchat-supabase
//!
//! Collaborators connecting the reconciler to a Supabase-backed deployment.
//!
//! Documents live in a `documents` table whose `status` column the ingestion
//! pipeline advances and whose `error_message` column explains failures. This
//! crate reads that row, follows its changes, submits new uploads and chats about finished ones:
//!
//! | Type | Implements | Transport |
//! |------|------------|-----------|
//! | [`SupabaseStatusSource`] | [`StatusSource`](pdfchat_core::StatusSource) | PostgREST poll, Realtime websocket push |
//! | [`BackendUploader`] | [`Uploader`](pdfchat_core::Uploader) | Backend API, multipart or JSON |
//! | [`BackendChat`] | [`Chat`](pdfchat_core::Chat) | Backend API, JSON |
//!
//! ## Example
//!
//! ```rust,no_run
//! use executor_core::tokio::TokioGlobal;
//! use pdfchat_supabase::{SupabaseConfig, SupabaseStatusSource};
//!
//! let config = SupabaseConfig::from_env()?;
//! let source = SupabaseStatusSource::new(config, TokioGlobal);
//! # Ok::<(), pdfchat_supabase::SupabaseError>(())
//! ```

mod api;
mod chat;
mod config;
mod error;
pub mod realtime;
mod rest;
mod source;
mod upload;

pub use api::DEFAULT_API_BASE;
pub use chat::BackendChat;
pub use config::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_SCHEMA, DEFAULT_TABLE, SupabaseConfig};
pub use error::{Result, SupabaseError};
pub use source::SupabaseStatusSource;
pub use upload::BackendUploader;
