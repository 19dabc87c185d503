//! Integration tests for authentication, health, and run cancellation.
//!
//! Every test goes through the full production router (request ids, CORS,
//! timeouts, error mapping). The database pool never connects; the paths
//! asserted here are answered by the auth layer, the live registry, or the
//! health probes before any query would be issued.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use runforge_core::status::RunStatus;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn liveness_probe_needs_no_credentials() {
    let (app, _state) = common::build_test_app();

    let response = common::get(app, "/healthz").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn health_reports_degraded_when_database_is_unreachable() {
    let (app, _state) = common::build_test_app();

    let response = common::get(app, "/api/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert!(json["version"].is_string());
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_credentials_are_rejected() {
    let (app, _state) = common::build_test_app();

    let response = common::get(app, "/api/runs").await;

    common::assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() {
    let (app, _state) = common::build_test_app();

    let request = Request::builder()
        .uri("/api/runs")
        .header(header::AUTHORIZATION, "Token abc123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = common::body_json(response).await;
    assert_eq!(
        json["error"],
        "Invalid Authorization format. Expected: Bearer <token>"
    );
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() {
    let (app, _state) = common::build_test_app();

    let response = common::get_authed(app, "/api/runs", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = common::body_json(response).await;
    assert_eq!(json["error"], "Invalid or expired token");
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelling_an_untracked_run_is_not_found() {
    let (app, _state) = common::build_test_app();
    let token = common::auth_token();

    let response = common::post_authed(app, "/api/runs/42/cancel", &token).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = common::body_json(response).await;
    assert_eq!(json["error"], "run not in progress");
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn cancelling_a_live_run_fires_its_token() {
    let (app, state) = common::build_test_app();
    let cancel = CancellationToken::new();
    state.registry.register(7, cancel.clone()).await;

    let token = common::auth_token();
    let response = common::post_authed(app, "/api/runs/7/cancel", &token).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn cancelling_a_finished_run_is_not_found() {
    let (app, state) = common::build_test_app();
    let cancel = CancellationToken::new();
    state.registry.register(8, cancel.clone()).await;
    state.registry.finish(8, RunStatus::Success).await;

    let token = common::auth_token();
    let response = common::post_authed(app, "/api/runs/8/cancel", &token).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!cancel.is_cancelled());
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let (app, _state) = common::build_test_app();

    let response = common::get(app, "/healthz").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header should be set")
        .to_str()
        .unwrap();
    assert_eq!(request_id.len(), 36, "expected a UUID, got {request_id}");
}

#[tokio::test]
async fn cors_preflight_allows_the_configured_origin() {
    let (app, _state) = common::build_test_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/runs")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("allow-origin header should be set"),
        "http://localhost:5173"
    );
    let allowed_methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .expect("allow-methods header should be set")
        .to_str()
        .unwrap();
    assert!(allowed_methods.contains("POST"));
}
