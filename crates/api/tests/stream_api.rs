//! Integration tests for the live output stream endpoint.
//!
//! The registry is seeded directly, so the full SSE path (subscribe, replay,
//! tail, terminal event) is exercised without a database or an SSH target.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use runforge_core::status::RunStatus;

// ---------------------------------------------------------------------------
// Live runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_replays_history_then_tails_until_done() {
    let (app, state) = common::build_test_app();
    state.registry.register(7, CancellationToken::new()).await;
    state.registry.append(7, "alpha".to_string()).await;

    // Subscription happens inside the handler, before the response exists,
    // so lines appended afterwards are part of the tail.
    let token = common::auth_token();
    let response = common::get_authed(app, "/api/runs/7/stream", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .expect("content-type should be set"),
        "text/event-stream"
    );

    state.registry.append(7, "beta".to_string()).await;
    state.registry.finish(7, RunStatus::Success).await;

    let body = common::body_text(response).await;
    assert!(body.contains("data: alpha"), "missing history line: {body}");
    assert!(body.contains("data: beta"), "missing tailed line: {body}");
    assert!(body.contains("event: done"), "missing done event: {body}");
    assert!(body.contains("data: success"), "missing status: {body}");
    let alpha = body.find("data: alpha").unwrap();
    let beta = body.find("data: beta").unwrap();
    assert!(alpha < beta, "history must precede the tail: {body}");
}

#[tokio::test]
async fn stream_of_a_finished_run_replays_and_closes_immediately() {
    let (app, state) = common::build_test_app();
    state.registry.register(9, CancellationToken::new()).await;
    state.registry.append(9, "one".to_string()).await;
    state.registry.append(9, "two".to_string()).await;
    state.registry.finish(9, RunStatus::Failed).await;

    let token = common::auth_token();
    let response = common::get_authed(app, "/api/runs/9/stream", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Nothing else will ever arrive; the body must already be complete.
    let body = common::body_text(response).await;
    assert!(body.contains("data: one"), "missing line: {body}");
    assert!(body.contains("data: two"), "missing line: {body}");
    assert!(body.contains("event: done"), "missing done event: {body}");
    assert!(body.contains("data: failed"), "missing status: {body}");
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_accepts_the_token_query_parameter() {
    let (app, state) = common::build_test_app();
    state.registry.register(11, CancellationToken::new()).await;
    state.registry.finish(11, RunStatus::Success).await;

    let token = common::auth_token();
    let request = Request::builder()
        .uri(format!("/api/runs/11/stream?token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_text(response).await;
    assert!(body.contains("event: done"), "missing done event: {body}");
}

#[tokio::test]
async fn stream_requires_credentials() {
    let (app, state) = common::build_test_app();
    state.registry.register(12, CancellationToken::new()).await;

    let response = common::get(app, "/api/runs/12/stream").await;

    common::assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}
