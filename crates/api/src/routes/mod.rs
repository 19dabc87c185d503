pub mod health;
pub mod hosts;
pub mod job_definitions;
pub mod runs;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                              service + database health
///
/// /runs                                list, submit (GET, POST)
/// /runs/{id}                           get run with output (GET)
/// /runs/{id}/cancel                    cancel live run (POST)
/// /runs/{id}/stream                    live output stream (mounted by the
///                                      app router, outside the timeout)
///
/// /job-definitions/{id}/webhook-token  regenerate, revoke (POST, DELETE)
///
/// /hosts/{id}/test                     SSH connectivity probe (POST)
///
/// /webhook/job-definitions/{token}     public trigger gateway (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Service health with a database round trip.
        .merge(health::router())
        // Run lifecycle: submit, list, inspect, cancel.
        .nest("/runs", runs::router())
        // Webhook credential management for job definitions.
        .nest("/job-definitions", job_definitions::router())
        // SSH connectivity probes.
        .nest("/hosts", hosts::router())
        // Public trigger gateway, authenticated by capability token.
        .nest("/webhook", webhook::router())
}
