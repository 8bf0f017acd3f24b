//! End-to-end tests: the data client against a live procedure server.
//!
//! The server runs on an ephemeral port over a `MockStore`, so store call
//! counts show whether a query was served from the cache.

use std::sync::Arc;

use convene_api::auth::FixedClock;
use convene_api::{
    create_api_router, issue_session_token, ApiConfig, AppState, AuthConfig, CreateAgentInput,
    CreateMeetingInput, ErrorCode, GetManyAgentsInput, GetManyMeetingsInput, JwtSessionAuthority,
    Procedure, UpdateAgentInput,
};
use convene_client::{ClientConfig, ClientError, DataClient, QueryCache, QueryKey, RpcClient};
use convene_test_utils::fixtures::{ALICE, BOB};
use convene_test_utils::MockStore;
use serde_json::json;

/// 2024-01-01 00:00:00 UTC
const NOW: i64 = 1704067200;
const SECRET: &str = "test_secret_for_client_tests_0123456789";

struct Server {
    base_url: String,
    store: MockStore,
    auth: AuthConfig,
}

impl Server {
    async fn start() -> Self {
        let store = MockStore::new();
        let auth = AuthConfig::with_secret(SECRET)
            .unwrap()
            .with_clock(Arc::new(FixedClock(NOW)));
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(JwtSessionAuthority::new(auth.clone())),
        );
        let router = create_api_router(state, &ApiConfig::default()).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            store,
            auth,
        }
    }

    fn config(&self, user_id: Option<&str>) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            session_token: user_id
                .map(|user| issue_session_token(&self.auth, user, None, None).unwrap()),
            request_timeout_ms: 5_000,
            stale_time_ms: 60_000,
        }
    }

    fn client(&self, user_id: &str) -> DataClient {
        DataClient::from_config(&self.config(Some(user_id))).unwrap()
    }
}

fn agent_input(name: &str) -> CreateAgentInput {
    CreateAgentInput {
        name: name.to_string(),
        instructions: format!("You are {}.", name),
    }
}

#[tokio::test]
async fn test_anonymous_client_is_unauthorized_without_store_calls() {
    let server = Server::start().await;
    let client = DataClient::from_config(&server.config(None)).unwrap();

    let err = client.agents(&GetManyAgentsInput::default()).await.unwrap_err();
    assert!(err.is_unauthorized());

    let err = client.create_agent(&agent_input("Tutor")).await.unwrap_err();
    assert!(err.is_unauthorized());

    assert_eq!(server.store.call_count(), 0);
    assert!(client.cache().is_empty().unwrap());
}

#[tokio::test]
async fn test_repeated_query_is_served_from_cache() {
    let server = Server::start().await;
    let client = server.client(ALICE);
    client.create_agent(&agent_input("Tutor")).await.unwrap();

    let first = client.agents(&GetManyAgentsInput::default()).await.unwrap();
    let calls = server.store.call_count();
    let second = client.agents(&GetManyAgentsInput::default()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_count, 1);
    assert_eq!(server.store.call_count(), calls);
}

#[tokio::test]
async fn test_creating_a_meeting_refreshes_agent_counts() {
    let server = Server::start().await;
    let client = server.client(ALICE);
    let agent = client.create_agent(&agent_input("Tutor")).await.unwrap();

    let before = client.agent(agent.id).await.unwrap();
    assert_eq!(before.meeting_count, 0);

    let meeting = client
        .create_meeting(&CreateMeetingInput {
            name: "Kickoff".to_string(),
            agent_id: agent.id.to_string(),
        })
        .await
        .unwrap();

    let after = client.agent(agent.id).await.unwrap();
    assert_eq!(after.meeting_count, 1);

    let page = client
        .meetings(&GetManyMeetingsInput {
            agent_id: Some(agent.id.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].meeting.id, meeting.id);
    assert_eq!(page.items[0].agent.name, "Tutor");
}

#[tokio::test]
async fn test_failed_mutation_leaves_cache_untouched() {
    let server = Server::start().await;
    let client = server.client(ALICE);
    let agent = client.create_agent(&agent_input("Tutor")).await.unwrap();
    client.agents(&GetManyAgentsInput::default()).await.unwrap();
    client.agent(agent.id).await.unwrap();
    let cached = client.cache().len().unwrap();

    let err = client
        .update_agent(&UpdateAgentInput {
            id: convene_core::new_entity_id().to_string(),
            name: Some("Ghost".to_string()),
            instructions: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .update_agent(&UpdateAgentInput {
            id: agent.id.to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::BadRequest));

    assert_eq!(client.cache().len().unwrap(), cached);
}

#[tokio::test]
async fn test_renaming_an_agent_refreshes_cached_meetings() {
    let server = Server::start().await;
    let client = server.client(ALICE);
    let agent = client.create_agent(&agent_input("Tutor")).await.unwrap();
    let meeting = client
        .create_meeting(&CreateMeetingInput {
            name: "Kickoff".to_string(),
            agent_id: agent.id.to_string(),
        })
        .await
        .unwrap();

    let page = client.meetings(&GetManyMeetingsInput::default()).await.unwrap();
    assert_eq!(page.items[0].agent.name, "Tutor");
    assert_eq!(client.meeting(meeting.id).await.unwrap().agent.name, "Tutor");

    client
        .update_agent(&UpdateAgentInput {
            id: agent.id.to_string(),
            name: Some("Coach".to_string()),
            instructions: None,
        })
        .await
        .unwrap();

    let page = client.meetings(&GetManyMeetingsInput::default()).await.unwrap();
    assert_eq!(page.items[0].agent.name, "Coach");
    assert_eq!(client.meeting(meeting.id).await.unwrap().agent.name, "Coach");
}

#[tokio::test]
async fn test_removing_an_agent_drops_its_meetings_from_cache() {
    let server = Server::start().await;
    let client = server.client(ALICE);
    let agent = client.create_agent(&agent_input("Tutor")).await.unwrap();
    let meeting = client
        .create_meeting(&CreateMeetingInput {
            name: "Kickoff".to_string(),
            agent_id: agent.id.to_string(),
        })
        .await
        .unwrap();
    client.meeting(meeting.id).await.unwrap();

    client.remove_agent(agent.id).await.unwrap();

    let err = client.meeting(meeting.id).await.unwrap_err();
    assert!(err.is_not_found());
    let page = client.agents(&GetManyAgentsInput::default()).await.unwrap();
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn test_other_users_rows_are_not_found() {
    let server = Server::start().await;
    let alice = server.client(ALICE);
    let bob = server.client(BOB);
    let agent = alice.create_agent(&agent_input("Private")).await.unwrap();

    let err = bob.agent(agent.id).await.unwrap_err();
    assert!(err.is_not_found());
    let err = bob.remove_agent(agent.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(server.store.agent_total().unwrap(), 1);
}

#[tokio::test]
async fn test_logout_clears_cache_and_session() {
    let server = Server::start().await;
    let mut client = server.client(ALICE);
    client.create_agent(&agent_input("Tutor")).await.unwrap();
    client.agents(&GetManyAgentsInput::default()).await.unwrap();
    assert!(!client.cache().is_empty().unwrap());

    client.logout().unwrap();

    assert!(client.cache().is_empty().unwrap());
    assert!(!client.rpc().has_session());
    let err = client.agents(&GetManyAgentsInput::default()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_prefetched_state_hydrates_a_fresh_client() {
    let server = Server::start().await;
    let config = server.config(Some(ALICE));
    let renderer = DataClient::from_config(&config).unwrap();
    renderer.create_agent(&agent_input("Tutor")).await.unwrap();
    renderer
        .prefetch(Procedure::AgentsGetMany, &json!({}))
        .await
        .unwrap();
    let snapshot = renderer.dehydrate().unwrap();
    assert_eq!(snapshot.queries.len(), 1);

    let browser = DataClient::new(
        RpcClient::new(&config).unwrap(),
        Arc::new(QueryCache::new(config.stale_time())),
    );
    assert_eq!(browser.hydrate(snapshot).unwrap(), 1);

    let calls = server.store.call_count();
    let page = browser.agents(&GetManyAgentsInput::default()).await.unwrap();
    assert_eq!(page.items[0].agent.name, "Tutor");
    assert_eq!(server.store.call_count(), calls);
}

#[tokio::test]
async fn test_prefetch_rejects_mutations() {
    let server = Server::start().await;
    let client = server.client(ALICE);
    let err = client
        .prefetch(Procedure::AgentsCreate, &json!({"name": "x", "instructions": "y"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert_eq!(server.store.call_count(), 0);
}

#[tokio::test]
async fn test_raw_rpc_client_round_trip() {
    let server = Server::start().await;
    let rpc = RpcClient::new(&server.config(Some(ALICE))).unwrap();

    let created: serde_json::Value = rpc
        .mutate(
            Procedure::AgentsCreate,
            &json!({"name": "Tutor", "instructions": "Teach", "userId": BOB}),
        )
        .await
        .unwrap();
    assert_eq!(created["userId"], ALICE);

    let key = QueryKey::new(Procedure::AgentsGetOne, &json!({"id": created["id"]})).unwrap();
    let detail: serde_json::Value = rpc
        .query(key.procedure, &key.input_value().unwrap())
        .await
        .unwrap();
    assert_eq!(detail["meetingCount"], 0);
}
