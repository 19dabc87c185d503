//! Route definitions for the `/hosts` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::hosts;
use crate::state::AppState;

/// Routes mounted at `/hosts`.
///
/// ```text
/// POST   /{id}/test       -> test_host
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/test", post(hosts::test_host))
}
