//! Route definitions for the inbound webhook gateway.
//!
//! These endpoints take no bearer token; the capability token in the path
//! is the credential.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Routes mounted at `/webhook`.
///
/// ```text
/// POST   /job-definitions/{token}    -> trigger_job_definition
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/job-definitions/{token}",
        post(webhook::trigger_job_definition),
    )
}
