//! Property-Based Tests for Ownership Isolation
//!
//! For any two distinct users and any agent owned by the first:
//! - the second user's getOne, update and remove all answer NOT_FOUND
//! - the same holds for the agent's meeting, and for creating a meeting
//!   against the foreign agent
//! - no row is created, changed or removed

mod support;

use axum::http::StatusCode;
use convene_storage::Store;
use convene_test_utils::assertions::assert_ok;
use convene_test_utils::fixtures::{meeting_for, minutes_after_epoch};
use convene_test_utils::generators::{arb_agent, arb_user_id};
use convene_test_utils::{Agent, UserId};
use proptest::prelude::*;
use serde_json::json;
use support::{error_code, test_app};

fn owner_and_intruder() -> impl Strategy<Value = (Agent, UserId)> {
    (arb_user_id(), arb_user_id())
        .prop_filter("users must differ", |(owner, intruder)| owner != intruder)
        .prop_flat_map(|(owner, intruder)| (arb_agent(owner), Just(intruder)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn prop_agent_is_invisible_to_other_users((agent, intruder) in owner_and_intruder()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = test_app();
            let inserted = app.store.agent_insert(&agent).await;
            assert_ok(&inserted);
            let token = app.token_for(&intruder);
            let id = json!({"id": agent.id.to_string()});

            let (status, body) = app.query("agents.getOne", Some(id.clone()), Some(&token)).await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);
            prop_assert_eq!(error_code(&body), "NOT_FOUND");

            let (status, _) = app
                .mutate(
                    "agents.update",
                    json!({"id": agent.id.to_string(), "name": "Hijacked"}),
                    Some(&token),
                )
                .await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);

            let (status, _) = app.mutate("agents.remove", id, Some(&token)).await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);

            prop_assert_eq!(app.store.agent_total().unwrap(), 1);
            let stored = app.store.agent_get(agent.id, &agent.user_id).await.unwrap();
            prop_assert_eq!(stored.map(|d| d.agent.name), Some(agent.name.clone()));

            // The intruder's own listing stays empty.
            let data = app.query_ok(&intruder, "agents.getMany", json!({})).await;
            prop_assert_eq!(data["totalCount"].as_i64(), Some(0));
            Ok(())
        })?;
    }

    #[test]
    fn prop_meeting_is_invisible_to_other_users((agent, intruder) in owner_and_intruder()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = test_app();
            app.store.agent_insert(&agent).await.unwrap();
            let meeting = meeting_for(&agent, "Weekly sync", minutes_after_epoch(1));
            app.store.meeting_insert(&meeting).await.unwrap();
            let token = app.token_for(&intruder);
            let id = json!({"id": meeting.id.to_string()});

            let (status, _) = app.query("meetings.getOne", Some(id.clone()), Some(&token)).await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);

            let (status, _) = app
                .mutate(
                    "meetings.update",
                    json!({"id": meeting.id.to_string(), "name": "Hijacked"}),
                    Some(&token),
                )
                .await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);

            let (status, _) = app.mutate("meetings.remove", id, Some(&token)).await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);

            let (status, body) = app
                .mutate(
                    "meetings.create",
                    json!({"name": "Sneaky", "agentId": agent.id.to_string()}),
                    Some(&token),
                )
                .await;
            prop_assert_eq!(status, StatusCode::NOT_FOUND);
            prop_assert_eq!(body["error"]["message"].as_str(), Some("Agent not found"));

            prop_assert_eq!(app.store.meeting_total().unwrap(), 1);
            let stored = app.store.meeting_get(meeting.id, &agent.user_id).await.unwrap();
            prop_assert_eq!(stored.map(|d| d.meeting.name), Some(meeting.name.clone()));
            Ok(())
        })?;
    }
}
