//! Route definitions for the `/runs` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

/// Routes mounted at `/runs`.
///
/// ```text
/// GET    /                -> list_runs
/// POST   /                -> submit_run
/// GET    /{id}            -> get_run
/// POST   /{id}/cancel     -> cancel_run
/// ```
///
/// `GET /{id}/stream` belongs to this resource too, but is mounted directly
/// by the app router so it sits outside the request timeout.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(runs::list_runs).post(runs::submit_run))
        .route("/{id}", get(runs::get_run))
        .route("/{id}/cancel", post(runs::cancel_run))
}
