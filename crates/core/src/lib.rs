//! Shared domain types and pure logic for the runforge workspace.
//!
//! Everything here is independent of the database, the network, and the
//! async runtime: id/timestamp aliases, the domain error enum, run status
//! values, cron expression handling, run-variable construction, and the
//! secret cipher used for credential vaults.

pub mod cron;
pub mod crypto;
pub mod error;
pub mod status;
pub mod types;
pub mod vars;
