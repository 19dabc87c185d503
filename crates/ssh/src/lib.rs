//! Remote execution client.
//!
//! Opens an SSH session to a registered host, uploads script content, and
//! executes it with interpolated variables while streaming output lines
//! back to the caller. Non-zero exit codes are an execution outcome, not an
//! error; [`SshClientError`] is reserved for "could not run at all"
//! (key/auth/transport failures).

pub mod client;
pub mod exec;

pub use client::{SshClientError, SshSession};
pub use exec::{sh_quote, ExecOutcome, ScriptRun, SecretMaterial};
