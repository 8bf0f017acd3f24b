//! Entity rows for agents and meetings.
//!
//! These are the shapes persisted by the store and returned to callers.
//! Field names serialize as camelCase to match the wire format.

use crate::{EntityId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Entity type discriminator used in errors and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Agent,
    Meeting,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Agent => "agent",
            EntityType::Meeting => "meeting",
        }
    }
}

/// An AI assistant profile owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: EntityId,
    pub name: String,
    /// Instructions the agent follows during meetings.
    pub instructions: String,
    pub user_id: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Agent {
    /// Check whether the given user owns this agent.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Minimal projection embedded in meeting responses.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Agent row with its derived meeting count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDetail {
    #[serde(flatten)]
    pub agent: Agent,
    /// Number of the owner's meetings that reference this agent.
    pub meeting_count: i64,
}

/// Minimal agent projection (id and name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: EntityId,
    pub name: String,
}

/// A meeting between a user and one of their agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: EntityId,
    pub name: String,
    pub user_id: UserId,
    pub agent_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Meeting {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Meeting row joined with the agent it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub meeting: Meeting,
    pub agent: AgentSummary,
}
