//! In-memory store for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use convene_core::{
    Agent, AgentDetail, EntityId, EntityType, Meeting, MeetingDetail, PageWindow, StorageError,
    StorageResult, Timestamp,
};

use crate::{AgentFilter, AgentUpdate, MeetingFilter, MeetingUpdate, Store};

/// In-memory mock store.
///
/// Clones share the same tables, so a test can keep a handle for
/// inspection while the router owns another.
#[derive(Debug, Default, Clone)]
pub struct MockStore {
    agents: Arc<RwLock<HashMap<EntityId, Agent>>>,
    meetings: Arc<RwLock<HashMap<EntityId, Meeting>>>,
    calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

fn read<T>(lock: &RwLock<T>) -> StorageResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> StorageResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

/// Newest first; ties broken by id so the order is total.
fn newest_first(a: (&Timestamp, &EntityId), b: (&Timestamp, &EntityId)) -> std::cmp::Ordering {
    b.0.cmp(a.0).then_with(|| b.1.cmp(a.1))
}

impl MockStore {
    /// Create a new, empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) -> StorageResult<()> {
        write(&self.agents)?.clear();
        write(&self.meetings)?.clear();
        Ok(())
    }

    /// Number of store calls made so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Get count of stored agents across all owners.
    pub fn agent_total(&self) -> StorageResult<usize> {
        Ok(read(&self.agents)?.len())
    }

    /// Get count of stored meetings across all owners.
    pub fn meeting_total(&self) -> StorageResult<usize> {
        Ok(read(&self.meetings)?.len())
    }

    fn begin(&self) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: "mock store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn meeting_count_for(meetings: &HashMap<EntityId, Meeting>, agent: &Agent) -> i64 {
        meetings
            .values()
            .filter(|m| m.agent_id == agent.id && m.user_id == agent.user_id)
            .count() as i64
    }

    fn detail_for(
        meeting: &Meeting,
        agents: &HashMap<EntityId, Agent>,
    ) -> Option<MeetingDetail> {
        agents.get(&meeting.agent_id).map(|agent| MeetingDetail {
            meeting: meeting.clone(),
            agent: agent.summary(),
        })
    }
}

#[async_trait]
impl Store for MockStore {
    async fn health_check(&self) -> StorageResult<()> {
        self.begin()
    }

    // === Agent Operations ===

    async fn agent_insert(&self, agent: &Agent) -> StorageResult<Agent> {
        self.begin()?;
        let mut agents = write(&self.agents)?;
        if agents.contains_key(&agent.id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Agent,
                reason: "already exists".to_string(),
            });
        }
        agents.insert(agent.id, agent.clone());
        Ok(agent.clone())
    }

    async fn agent_get(&self, id: EntityId, user_id: &str) -> StorageResult<Option<AgentDetail>> {
        self.begin()?;
        let agents = read(&self.agents)?;
        let meetings = read(&self.meetings)?;
        Ok(agents
            .get(&id)
            .filter(|a| a.is_owned_by(user_id))
            .map(|agent| AgentDetail {
                agent: agent.clone(),
                meeting_count: Self::meeting_count_for(&meetings, agent),
            }))
    }

    async fn agent_list(
        &self,
        filter: &AgentFilter,
        window: PageWindow,
    ) -> StorageResult<Vec<AgentDetail>> {
        self.begin()?;
        let agents = read(&self.agents)?;
        let meetings = read(&self.meetings)?;

        let mut matching: Vec<&Agent> = agents.values().filter(|a| filter.matches(a)).collect();
        matching.sort_by(|a, b| newest_first((&a.created_at, &a.id), (&b.created_at, &b.id)));

        Ok(window
            .apply(matching)
            .into_iter()
            .map(|agent| AgentDetail {
                agent: agent.clone(),
                meeting_count: Self::meeting_count_for(&meetings, agent),
            })
            .collect())
    }

    async fn agent_count(&self, filter: &AgentFilter) -> StorageResult<i64> {
        self.begin()?;
        let agents = read(&self.agents)?;
        Ok(agents.values().filter(|a| filter.matches(a)).count() as i64)
    }

    async fn agent_update(
        &self,
        id: EntityId,
        user_id: &str,
        update: &AgentUpdate,
        updated_at: Timestamp,
    ) -> StorageResult<Option<Agent>> {
        self.begin()?;
        let mut agents = write(&self.agents)?;
        let Some(agent) = agents.get_mut(&id).filter(|a| a.is_owned_by(user_id)) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            agent.name = name.clone();
        }
        if let Some(instructions) = &update.instructions {
            agent.instructions = instructions.clone();
        }
        agent.updated_at = updated_at;

        Ok(Some(agent.clone()))
    }

    async fn agent_delete(&self, id: EntityId, user_id: &str) -> StorageResult<Option<Agent>> {
        self.begin()?;
        let mut agents = write(&self.agents)?;
        let owned = agents.get(&id).is_some_and(|a| a.is_owned_by(user_id));
        if !owned {
            return Ok(None);
        }
        let removed = agents.remove(&id);

        // Cascade, matching the foreign key in the SQL schema.
        write(&self.meetings)?.retain(|_, m| m.agent_id != id);

        Ok(removed)
    }

    // === Meeting Operations ===

    async fn meeting_insert(&self, meeting: &Meeting) -> StorageResult<Meeting> {
        self.begin()?;
        let agents = read(&self.agents)?;
        if !agents.contains_key(&meeting.agent_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Meeting,
                reason: format!("agent {} does not exist", meeting.agent_id),
            });
        }
        let mut meetings = write(&self.meetings)?;
        if meetings.contains_key(&meeting.id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Meeting,
                reason: "already exists".to_string(),
            });
        }
        meetings.insert(meeting.id, meeting.clone());
        Ok(meeting.clone())
    }

    async fn meeting_get(
        &self,
        id: EntityId,
        user_id: &str,
    ) -> StorageResult<Option<MeetingDetail>> {
        self.begin()?;
        let agents = read(&self.agents)?;
        let meetings = read(&self.meetings)?;
        Ok(meetings
            .get(&id)
            .filter(|m| m.is_owned_by(user_id))
            .and_then(|m| Self::detail_for(m, &agents)))
    }

    async fn meeting_list(
        &self,
        filter: &MeetingFilter,
        window: PageWindow,
    ) -> StorageResult<Vec<MeetingDetail>> {
        self.begin()?;
        let agents = read(&self.agents)?;
        let meetings = read(&self.meetings)?;

        let mut matching: Vec<&Meeting> =
            meetings.values().filter(|m| filter.matches(m)).collect();
        matching.sort_by(|a, b| newest_first((&a.created_at, &a.id), (&b.created_at, &b.id)));

        Ok(window
            .apply(matching)
            .into_iter()
            .filter_map(|m| Self::detail_for(m, &agents))
            .collect())
    }

    async fn meeting_count(&self, filter: &MeetingFilter) -> StorageResult<i64> {
        self.begin()?;
        let meetings = read(&self.meetings)?;
        Ok(meetings.values().filter(|m| filter.matches(m)).count() as i64)
    }

    async fn meeting_update(
        &self,
        id: EntityId,
        user_id: &str,
        update: &MeetingUpdate,
        updated_at: Timestamp,
    ) -> StorageResult<Option<Meeting>> {
        self.begin()?;
        let mut meetings = write(&self.meetings)?;
        let Some(meeting) = meetings.get_mut(&id).filter(|m| m.is_owned_by(user_id)) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            meeting.name = name.clone();
        }
        if let Some(agent_id) = update.agent_id {
            meeting.agent_id = agent_id;
        }
        meeting.updated_at = updated_at;

        Ok(Some(meeting.clone()))
    }

    async fn meeting_delete(&self, id: EntityId, user_id: &str) -> StorageResult<Option<Meeting>> {
        self.begin()?;
        let mut meetings = write(&self.meetings)?;
        let owned = meetings.get(&id).is_some_and(|m| m.is_owned_by(user_id));
        if !owned {
            return Ok(None);
        }
        Ok(meetings.remove(&id))
    }
}
