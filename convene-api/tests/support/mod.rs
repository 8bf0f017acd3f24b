//! Shared harness for procedure endpoint tests.
//!
//! Builds the real router over a `MockStore` and the JWT session authority
//! with a fixed clock, so tokens are deterministic.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use convene_api::auth::FixedClock;
use convene_api::{
    create_api_router, issue_session_token, ApiConfig, AppState, AuthConfig, JwtSessionAuthority,
};
use convene_test_utils::MockStore;
use serde_json::Value;
use tower::ServiceExt;

/// 2024-01-01 00:00:00 UTC
pub const NOW: i64 = 1704067200;

pub const TEST_SECRET: &str = "test_secret_for_procedure_tests_0123456789";

pub struct TestApp {
    pub router: Router,
    pub store: MockStore,
    pub auth: AuthConfig,
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig::with_secret(TEST_SECRET)
        .unwrap()
        .with_clock(Arc::new(FixedClock(NOW)))
}

pub fn test_app() -> TestApp {
    let store = MockStore::new();
    let auth = test_auth_config();
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(JwtSessionAuthority::new(auth.clone())),
    );
    let router = create_api_router(state, &ApiConfig::default()).unwrap();
    TestApp {
        router,
        store,
        auth,
    }
}

impl TestApp {
    pub fn token_for(&self, user_id: &str) -> String {
        issue_session_token(&self.auth, user_id, None, None).unwrap()
    }

    /// Send a request and decode the JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    /// GET a query procedure, optionally with input and a session token.
    pub async fn query(
        &self,
        path: &str,
        input: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let uri = match input {
            Some(input) => format!(
                "/api/trpc/{}?input={}",
                path,
                urlencoding::encode(&input.to_string())
            ),
            None => format!("/api/trpc/{}", path),
        };
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a mutation procedure with a JSON body.
    pub async fn mutate(
        &self,
        path: &str,
        input: Value,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/trpc/{}", path))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(input.to_string())).unwrap())
            .await
    }

    /// Query as `user_id`, asserting success, and return `result.data`.
    pub async fn query_ok(&self, user_id: &str, path: &str, input: Value) -> Value {
        let token = self.token_for(user_id);
        let (status, body) = self.query(path, Some(input), Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", path, body);
        body["result"]["data"].clone()
    }

    /// Mutate as `user_id`, asserting success, and return `result.data`.
    pub async fn mutate_ok(&self, user_id: &str, path: &str, input: Value) -> Value {
        let token = self.token_for(user_id);
        let (status, body) = self.mutate(path, input, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", path, body);
        body["result"]["data"].clone()
    }
}

/// Error code from an error envelope.
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
