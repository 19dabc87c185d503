//! Authentication middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer
//!   token (or `?token=` for `EventSource` clients).

pub mod auth;
