//! # pdfchat-reconciler
//!
//! Keeps a client's view of one document in sync with server-side ingestion.
//!
//! A document's status reaches the client through two independent channels: a
//! periodic poll of the status source and a push subscription to row changes.
//! [`Reconciler`] merges both into a single lifecycle state, derives one
//! user-facing [`Notification`](pdfchat_core::Notification) per accepted update,
//! expires notifications after a fixed window and tears both channels down once
//! the document reaches a terminal state.
//!
//! ```text
//!   poll tick ──┐
//!               ├──▶ on_update ──▶ state + notification ──▶ terminal? release all
//!   push event ─┘
//! ```
//!
//! Collaborators are injected: any [`StatusSource`](pdfchat_core::StatusSource)
//! and any [`Scheduler`](pdfchat_core::Scheduler). Use [`ExecutorScheduler`] in
//! production and [`ManualScheduler`] where time must be driven by hand.

mod config;
mod error;
mod manual;
mod notify;
mod reconciler;
mod scheduler;
mod session;

pub use config::{
    DEFAULT_FAILURE_MESSAGE, DEFAULT_NOTIFICATION_TTL, DEFAULT_POLL_INTERVAL, ReconcilerConfig,
    ReconcilerConfigBuilder,
};
pub use error::{Channel, ReconcileError};
pub use manual::ManualScheduler;
pub use notify::messages;
pub use reconciler::Reconciler;
pub use scheduler::ExecutorScheduler;
