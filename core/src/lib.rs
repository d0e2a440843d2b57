//! # pdfchat-core
//!
//! Shared vocabulary for tracking a document through server-side ingestion.
//!
//! A PDF uploaded to the backend moves through a small lifecycle before it can be
//! chatted with. This crate hosts the types describing that lifecycle and the
//! traits of the collaborators a client consumes to observe it:
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │   Your App      │───▶│  pdfchat-core    │◀───│  Collaborators   │
//! │                 │    │  (this crate)    │    │                  │
//! │ - Upload view   │    │ - LifecycleState │    │ - Supabase REST  │
//! │ - Chat view     │    │ - StatusSource   │    │ - Realtime push  │
//! │ - CLI watcher   │    │ - Scheduler      │    │ - Backend API    │
//! └─────────────────┘    └──────────────────┘    └──────────────────┘
//! ```
//!
//! | Concern | Trait | Description |
//! |---------|-------|-------------|
//! | **Status lookup** | [`StatusSource`] | Poll the latest state, or subscribe to pushed row changes |
//! | **Timers** | [`Scheduler`] | Repeating timers, one-shot delays and the clock |
//! | **Upload** | [`Uploader`] | Submit a file or URL and receive an acknowledgment |
//! | **Chat** | [`Chat`] | Send a conversation about a document and receive the reply with its sources |
//!
//! ## Example
//!
//! ```rust
//! use pdfchat_core::{LifecycleState, StatusReport};
//!
//! let report = StatusReport::new("PROCESSING");
//! let state = report.parse_state().unwrap();
//! assert_eq!(state, LifecycleState::Processing);
//! assert!(!state.is_terminal());
//! ```

pub mod chat;
pub mod document;
pub mod notification;
pub mod schedule;
pub mod source;
pub mod upload;

mod release;

#[doc(inline)]
pub use chat::{Chat, ChatMessage, ChatReply, Role};
#[doc(inline)]
pub use document::{DocumentId, LifecycleState, ParseStateError, StatusReport, StatusUpdate};
#[doc(inline)]
pub use notification::{Notification, Severity, Snapshot};
#[doc(inline)]
pub use schedule::{Scheduler, Tick, TimerHandle};
#[doc(inline)]
pub use source::{ChangeEvent, ChangeType, EventSink, PushEvent, StatusSource, Subscription};
#[doc(inline)]
pub use upload::{UploadAck, UploadSource, Uploader};

/// Result type used at collaborator seams.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result).
pub type Result<T = ()> = anyhow::Result<T>;

pub use anyhow::Error;
pub use time::OffsetDateTime;
