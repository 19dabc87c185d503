//! Request handlers for the execution API.
//!
//! Each submodule covers one resource. Handlers delegate to the
//! repositories in `runforge_db` and the launcher in [`crate::engine`],
//! mapping errors via [`AppError`](crate::error::AppError).

pub mod hosts;
pub mod job_definitions;
pub mod runs;
pub mod stream;
pub mod webhook;
