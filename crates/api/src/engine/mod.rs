//! Run execution engine.
//!
//! Contains the launcher that accepts run requests, drives each run over SSH
//! in a background task, and records the outcome, plus the [`RunTrigger`]
//! seam the scheduler and webhook gateway fire runs through.

pub mod launcher;

pub use launcher::{ExecSettings, RunLauncher, RunTrigger};
