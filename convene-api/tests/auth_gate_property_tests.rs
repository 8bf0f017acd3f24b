//! Property-Based Tests for the Session Gate
//!
//! For any procedure and any input, a request without a valid session is
//! answered with UNAUTHORIZED and causes no store access at all.

mod support;

use std::sync::Arc;

use axum::http::StatusCode;
use convene_api::auth::FixedClock;
use convene_api::{issue_session_token, Procedure, ProcedureKind};
use proptest::prelude::*;
use serde_json::{json, Value};
use support::{error_code, test_app, test_auth_config, NOW};

#[derive(Debug, Clone)]
enum Credentials {
    /// No Authorization header at all
    Missing,
    /// Something shaped like a JWT, but not signed by us
    ForgedJwt(String),
    /// Correctly signed, but expired weeks ago
    Expired(String),
}

impl Credentials {
    fn token(&self) -> Option<String> {
        match self {
            Credentials::Missing => None,
            Credentials::ForgedJwt(t) => Some(t.clone()),
            Credentials::Expired(user_id) => {
                let issued_long_ago = test_auth_config()
                    .with_clock(Arc::new(FixedClock(NOW - 30 * 24 * 3600)));
                Some(issue_session_token(&issued_long_ago, user_id.as_str(), None, None).unwrap())
            }
        }
    }
}

fn credentials_strategy() -> impl Strategy<Value = Credentials> {
    prop_oneof![
        Just(Credentials::Missing),
        "[A-Za-z0-9_-]{10,40}\\.[A-Za-z0-9_-]{10,40}\\.[A-Za-z0-9_-]{10,40}"
            .prop_map(Credentials::ForgedJwt),
        "user_[a-z0-9]{4,12}".prop_map(Credentials::Expired),
    ]
}

fn procedure_strategy() -> impl Strategy<Value = Procedure> {
    proptest::sample::select(Procedure::ALL.to_vec())
}

fn input_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!({})),
        "[a-z ]{0,12}".prop_map(|name| json!({"name": name, "instructions": "x"})),
        any::<i64>().prop_map(|page| json!({"page": page, "pageSize": page})),
        "[a-z0-9-]{0,36}".prop_map(|id| json!({"id": id, "userId": "someone-else"})),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No session means UNAUTHORIZED, whatever the procedure or input.
    #[test]
    fn prop_no_session_is_unauthorized_without_store_access(
        procedure in procedure_strategy(),
        input in input_strategy(),
        credentials in credentials_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = test_app();
            let token = credentials.token();

            let (status, body) = match procedure.kind() {
                ProcedureKind::Query => {
                    app.query(procedure.path(), Some(input), token.as_deref()).await
                }
                ProcedureKind::Mutation => {
                    app.mutate(procedure.path(), input, token.as_deref()).await
                }
            };

            prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
            prop_assert_eq!(error_code(&body), "UNAUTHORIZED");
            prop_assert_eq!(
                body["error"]["message"].as_str(),
                Some("You must be logged in to access this resource.")
            );
            prop_assert_eq!(app.store.call_count(), 0);
            Ok(())
        })?;
    }
}
