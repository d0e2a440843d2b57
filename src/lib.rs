//! # pdfchat
//!
//! Facade crate that re-exports everything from [`pdfchat_core`] plus the status
//! reconciler and, with the `supabase` feature, the Supabase collaborators. Pull
//! this crate into an application that uploads PDFs and needs to know when they
//! are ready to chat with.
//!
//! ## What's inside?
//!
//! - [`LifecycleState`](pdfchat_core::LifecycleState), [`StatusSource`](pdfchat_core::StatusSource)
//!   and [`Scheduler`](pdfchat_core::Scheduler) describing a document's progress and how to observe it.
//! - [`Reconciler`] merging polled and pushed status into one state with notifications.
//! - [`ExecutorScheduler`] for production and [`ManualScheduler`] for tests.
//! - `supabase`: [`supabase::SupabaseStatusSource`], [`supabase::BackendUploader`] and
//!   [`supabase::BackendChat`].
//!
//! ## Example
//!
//! ```rust
//! use pdfchat::{DocumentId, EventSink, LifecycleState, ManualScheduler, Reconciler, StatusReport, StatusSource, Subscription};
//!
//! struct Processing;
//!
//! impl StatusSource for Processing {
//!     async fn fetch_status(&self, _id: &DocumentId) -> pdfchat::Result<StatusReport> {
//!         Ok(StatusReport::new("processing"))
//!     }
//!
//!     fn subscribe(&self, _id: &DocumentId, _on_event: EventSink) -> pdfchat::Result<Subscription> {
//!         Ok(Subscription::inert())
//!     }
//! }
//!
//! let reconciler = Reconciler::new(Processing, ManualScheduler::new());
//! futures_lite::future::block_on(reconciler.start_raw("doc-1"));
//! assert_eq!(reconciler.current_state(), Some(LifecycleState::Processing));
//! assert!(reconciler.is_polling());
//!
//! reconciler.on_update(StatusReport::new("completed"));
//! assert!(!reconciler.is_polling());
//! ```

pub use pdfchat_core::*;
pub use pdfchat_reconciler::{
    Channel, ExecutorScheduler, ManualScheduler, ReconcileError, Reconciler, ReconcilerConfig,
    ReconcilerConfigBuilder, messages,
};

/// Supabase status source and backend uploader.
#[cfg(feature = "supabase")]
pub use pdfchat_supabase as supabase;
