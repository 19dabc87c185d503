//! Live-run state and completion notifications.
//!
//! This crate holds the in-memory side of run execution:
//!
//! - [`LiveRunRegistry`] — run-id keyed table of in-flight output buffers,
//!   subscriber channels, and cancellation handles.
//! - [`RunSubscription`] — a subscriber's view of one run: buffered history
//!   plus a live tail channel.
//! - [`Notifier`] — one-shot webhook and email delivery fired after a run
//!   reaches a terminal status.

pub mod notify;
pub mod registry;

pub use notify::{EmailConfig, NotificationTargets, Notifier, RunNotification};
pub use registry::{LiveRunRegistry, RunSubscription};
