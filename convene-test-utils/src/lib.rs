//! Convene Test Utilities
//!
//! Shared test infrastructure for the Convene workspace:
//! - Proptest generators for owners and agents
//! - Fixtures that build rows with controlled timestamps
//! - Assertions over storage results

// Re-export mock storage from its source crate
pub use convene_storage::MockStore;

pub use convene_core::{
    Agent, AgentDetail, EntityId, Meeting, MeetingDetail, PageRequest, StorageError,
    StorageResult, Timestamp, UserId, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Convene entity types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid UUIDv7 (timestamp-sortable).
    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    /// Generate an opaque owner id.
    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        "user_[a-z0-9]{4,12}"
    }

    /// Generate a non-blank display name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,23}"
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate an agent owned by `user_id`.
    pub fn arb_agent(user_id: UserId) -> impl Strategy<Value = Agent> {
        (arb_uuid_v7(), arb_name(), arb_name(), arb_timestamp()).prop_map(
            move |(id, name, instructions, created_at)| Agent {
                id,
                name,
                instructions,
                user_id: user_id.clone(),
                created_at,
                updated_at: created_at,
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows for common testing scenarios.

    use super::*;

    pub const ALICE: &str = "user_alice";
    pub const BOB: &str = "user_bob";

    /// 2024-01-01 00:00:00 UTC
    pub fn epoch() -> Timestamp {
        Utc.timestamp_opt(1704067200, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Timestamp `minutes` after `epoch()`.
    pub fn minutes_after_epoch(minutes: i64) -> Timestamp {
        epoch() + Duration::minutes(minutes)
    }

    /// An agent with an explicit creation time.
    pub fn agent_at(user_id: &str, name: &str, created_at: Timestamp) -> Agent {
        Agent {
            id: Uuid::now_v7(),
            name: name.to_string(),
            instructions: format!("You are {}.", name),
            user_id: user_id.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    /// A meeting on `agent`, owned by the agent's owner.
    pub fn meeting_for(agent: &Agent, name: &str, created_at: Timestamp) -> Meeting {
        Meeting {
            id: Uuid::now_v7(),
            name: name.to_string(),
            user_id: agent.user_id.clone(),
            agent_id: agent.id,
            created_at,
            updated_at: created_at,
        }
    }

    /// `count` agents for one owner, one minute apart, named "Agent 0".."Agent n".
    pub fn agent_series(user_id: &str, count: usize) -> Vec<Agent> {
        (0..count)
            .map(|i| agent_at(user_id, &format!("Agent {}", i), minutes_after_epoch(i as i64)))
            .collect()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over storage results.

    use super::*;

    /// Assert that a StorageResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &StorageResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a lookup succeeded but matched nothing.
    #[track_caller]
    pub fn assert_absent<T: std::fmt::Debug>(result: &StorageResult<Option<T>>) {
        match result {
            Ok(None) => {}
            other => panic!("Expected Ok(None), got: {:?}", other),
        }
    }

    /// Assert that agent details are ordered newest first with ids breaking ties.
    #[track_caller]
    pub fn assert_newest_first(items: &[AgentDetail]) {
        for pair in items.windows(2) {
            let (a, b) = (&pair[0].agent, &pair[1].agent);
            assert!(
                (a.created_at, a.id) > (b.created_at, b.id),
                "{} ({}) should sort before {} ({})",
                a.name,
                a.created_at,
                b.name,
                b.created_at
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use convene_storage::{AgentFilter, Store};

    #[test]
    fn test_agent_series_is_spaced() {
        let agents = agent_series(ALICE, 3);
        assert_eq!(agents.len(), 3);
        assert!(agents[2].created_at > agents[0].created_at);
        assert!(agents.iter().all(|a| a.user_id == ALICE));
    }

    #[tokio::test]
    async fn test_fixtures_load_into_mock_store() {
        let store = MockStore::new();
        for agent in agent_series(ALICE, 4) {
            store.agent_insert(&agent).await.unwrap();
        }

        let filter = AgentFilter::new(ALICE, None);
        let items = store
            .agent_list(&filter, PageRequest::new(1, 10).window())
            .await
            .unwrap();
        assert_eq!(items.len(), 4);
        assertions::assert_newest_first(&items);
        assertions::assert_absent(&store.agent_get(Uuid::now_v7(), ALICE).await);
    }
}
