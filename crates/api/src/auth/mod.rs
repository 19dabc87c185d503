//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token validation against the shared issuer secret.

pub mod jwt;
