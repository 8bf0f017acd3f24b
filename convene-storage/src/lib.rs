//! Convene Storage - Storage Trait and Mock Implementation
//!
//! Defines the persistence contract for agents and meetings. Every read,
//! update and delete is scoped by both the entity id and the owning user, so
//! a row belonging to someone else is indistinguishable from a missing one.
//!
//! The PostgreSQL implementation lives in convene-api (`db::DbClient`).

pub mod mock;

pub use mock::MockStore;

use async_trait::async_trait;
use convene_core::{
    Agent, AgentDetail, EntityId, Meeting, MeetingDetail, PageWindow, StorageResult, Timestamp,
    UserId,
};

// ============================================================================
// FILTERS
// ============================================================================

/// Filter for agent listings. Always scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFilter {
    pub user_id: UserId,
    /// Case-insensitive substring match on the name.
    pub search: Option<String>,
}

impl AgentFilter {
    /// Build a filter, dropping an empty search string.
    pub fn new(user_id: impl Into<UserId>, search: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            search: normalize_search(search),
        }
    }

    pub fn matches(&self, agent: &Agent) -> bool {
        agent.is_owned_by(&self.user_id) && name_matches(&agent.name, self.search.as_deref())
    }
}

/// Filter for meeting listings. Always scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingFilter {
    pub user_id: UserId,
    pub search: Option<String>,
    /// Restrict to meetings with this agent.
    pub agent_id: Option<EntityId>,
}

impl MeetingFilter {
    pub fn new(user_id: impl Into<UserId>, search: Option<String>, agent_id: Option<EntityId>) -> Self {
        Self {
            user_id: user_id.into(),
            search: normalize_search(search),
            agent_id,
        }
    }

    pub fn matches(&self, meeting: &Meeting) -> bool {
        meeting.is_owned_by(&self.user_id)
            && name_matches(&meeting.name, self.search.as_deref())
            && self.agent_id.map_or(true, |id| meeting.agent_id == id)
    }
}

/// Blank search means no filter. Anything else is matched as given.
fn normalize_search(search: Option<String>) -> Option<String> {
    search.filter(|s| !s.trim().is_empty())
}

/// Case-insensitive substring match. `None` matches everything.
pub fn name_matches(name: &str, search: Option<&str>) -> bool {
    match search {
        Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for agents. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub instructions: Option<String>,
}

/// Update payload for meetings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingUpdate {
    pub name: Option<String>,
    pub agent_id: Option<EntityId>,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Persistence contract for agents and meetings.
///
/// Lookups that match no row return `Ok(None)`. Listings are ordered by
/// `created_at DESC, id DESC` so pagination is stable.
#[async_trait]
pub trait Store: Send + Sync {
    /// Verify the backend is reachable.
    async fn health_check(&self) -> StorageResult<()>;

    // === Agent Operations ===

    /// Insert a fully-formed agent row and return it as stored.
    async fn agent_insert(&self, agent: &Agent) -> StorageResult<Agent>;

    /// Get an agent by id, scoped to its owner.
    async fn agent_get(&self, id: EntityId, user_id: &str) -> StorageResult<Option<AgentDetail>>;

    /// List one window of agents matching the filter.
    async fn agent_list(
        &self,
        filter: &AgentFilter,
        window: PageWindow,
    ) -> StorageResult<Vec<AgentDetail>>;

    /// Count all agents matching the filter.
    async fn agent_count(&self, filter: &AgentFilter) -> StorageResult<i64>;

    /// Apply an update scoped to the owner. `None` when no row matched.
    async fn agent_update(
        &self,
        id: EntityId,
        user_id: &str,
        update: &AgentUpdate,
        updated_at: Timestamp,
    ) -> StorageResult<Option<Agent>>;

    /// Delete an agent (and its meetings) scoped to the owner.
    async fn agent_delete(&self, id: EntityId, user_id: &str) -> StorageResult<Option<Agent>>;

    // === Meeting Operations ===

    async fn meeting_insert(&self, meeting: &Meeting) -> StorageResult<Meeting>;

    async fn meeting_get(&self, id: EntityId, user_id: &str)
        -> StorageResult<Option<MeetingDetail>>;

    async fn meeting_list(
        &self,
        filter: &MeetingFilter,
        window: PageWindow,
    ) -> StorageResult<Vec<MeetingDetail>>;

    async fn meeting_count(&self, filter: &MeetingFilter) -> StorageResult<i64>;

    async fn meeting_update(
        &self,
        id: EntityId,
        user_id: &str,
        update: &MeetingUpdate,
        updated_at: Timestamp,
    ) -> StorageResult<Option<Meeting>>;

    async fn meeting_delete(&self, id: EntityId, user_id: &str) -> StorageResult<Option<Meeting>>;
}
