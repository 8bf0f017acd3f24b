//! Transport tests for the procedure endpoint.
//!
//! Envelope shapes, method routing, unknown paths, malformed input, session
//! cookies and the public health/metrics routes.

mod support;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use support::{error_code, test_app};

#[tokio::test]
async fn test_success_uses_result_data_envelope() {
    let app = test_app();
    let token = app.token_for("user_alice");

    let (status, body) = app
        .query("agents.getMany", None, Some(&token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"result": {"data": {"items": [], "totalCount": 0, "totalPages": 0}}})
    );
}

#[tokio::test]
async fn test_unauthorized_uses_error_envelope_with_path() {
    let app = test_app();

    let (status, body) = app.query("agents.getMany", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(
        body["error"]["message"],
        "You must be logged in to access this resource."
    );
    assert_eq!(body["error"]["path"], "agents.getMany");
}

#[tokio::test]
async fn test_unknown_procedure_is_not_found() {
    let app = test_app();
    let token = app.token_for("user_alice");

    let (status, body) = app.query("agents.dropAll", None, Some(&token)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
    assert_eq!(body["error"]["path"], "agents.dropAll");
}

#[tokio::test]
async fn test_wrong_method_is_rejected_before_the_gate() {
    let app = test_app();

    // Query over POST
    let (status, body) = app.mutate("agents.getMany", json!({}), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_code(&body), "METHOD_NOT_SUPPORTED");

    // Mutation over GET
    let (status, body) = app.query("agents.create", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_code(&body), "METHOD_NOT_SUPPORTED");

    // Other verbs
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/trpc/agents.remove")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_code(&body), "METHOD_NOT_SUPPORTED");

    assert_eq!(app.store.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_parse_error_once_authenticated() {
    let app = test_app();
    let token = app.token_for("user_alice");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/trpc/agents.create")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "PARSE_ERROR");

    // Without a session the gate answers first.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/trpc/agents.create")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    assert_eq!(app.store.call_count(), 0);
}

#[tokio::test]
async fn test_empty_mutation_body_reports_field_errors() {
    let app = test_app();
    let token = app.token_for("user_alice");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/trpc/agents.create")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
    let fields = &body["error"]["details"]["fieldErrors"];
    assert_eq!(fields["name"][0], "Name is required");
    assert_eq!(fields["instructions"][0], "Instructions is required");
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = test_app();
    let token = app.token_for("user_alice");

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/trpc/agents.getMany")
        .header(
            header::COOKIE,
            format!("theme=dark; convene.session_token={}", token),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_no_session() {
    let app = test_app();
    let foreign = convene_api::AuthConfig::with_secret("another_secret_entirely_0123456789abc")
        .unwrap()
        .with_clock(std::sync::Arc::new(convene_api::auth::FixedClock(support::NOW)));
    let token = convene_api::issue_session_token(&foreign, "user_alice", None, None).unwrap();

    let (status, body) = app.query("agents.getMany", None, Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");
}

#[tokio::test]
async fn test_health_endpoints_need_no_session() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health/live")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let request = Request::builder()
        .uri("/health/ready")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"]["database"]["status"], "healthy");

    app.store.set_unavailable(true);
    let request = Request::builder()
        .uri("/health/ready")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_persistence_failure_is_opaque_internal_error() {
    let app = test_app();
    let token = app.token_for("user_alice");
    app.store.set_unavailable(true);

    let (status, body) = app.query("agents.getMany", None, Some(&token)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "INTERNAL_SERVER_ERROR");
    assert_eq!(body["error"]["message"], "Internal server error");
}

#[tokio::test]
async fn test_metrics_endpoint_reports_procedure_outcomes() {
    let app = test_app();
    app.query("agents.getMany", None, None).await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("convene_procedure_calls_total"));
    assert!(text.contains("convene_http_requests_total"));
}
