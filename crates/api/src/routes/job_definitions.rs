//! Route definitions for the `/job-definitions` resource.
//!
//! Only the webhook-token credential lives here; definition CRUD is owned
//! by the external control surface.

use axum::routing::post;
use axum::Router;

use crate::handlers::job_definitions;
use crate::state::AppState;

/// Routes mounted at `/job-definitions`.
///
/// ```text
/// POST   /{id}/webhook-token    -> regenerate_webhook_token
/// DELETE /{id}/webhook-token    -> revoke_webhook_token
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/webhook-token",
        post(job_definitions::regenerate_webhook_token)
            .delete(job_definitions::revoke_webhook_token),
    )
}
