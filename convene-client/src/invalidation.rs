//! What each mutation makes stale.

use convene_api::Procedure;
use convene_core::EntityId;
use serde_json::json;

use crate::query::{InvalidationTarget, QueryKey};

/// A successful mutation, carrying the ids the invalidation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    AgentCreated,
    AgentUpdated { id: EntityId },
    /// Removing an agent also removes its meetings.
    AgentRemoved { id: EntityId },
    MeetingCreated { agent_id: EntityId },
    MeetingUpdated { id: EntityId },
    MeetingRemoved { id: EntityId },
}

fn all(procedure: Procedure) -> InvalidationTarget {
    InvalidationTarget::Procedure(procedure)
}

fn by_id(procedure: Procedure, id: EntityId) -> InvalidationTarget {
    InvalidationTarget::Exact(QueryKey::from_value(
        procedure,
        &json!({ "id": id.to_string() }),
    ))
}

impl Mutation {
    pub fn procedure(&self) -> Procedure {
        match self {
            Mutation::AgentCreated => Procedure::AgentsCreate,
            Mutation::AgentUpdated { .. } => Procedure::AgentsUpdate,
            Mutation::AgentRemoved { .. } => Procedure::AgentsRemove,
            Mutation::MeetingCreated { .. } => Procedure::MeetingsCreate,
            Mutation::MeetingUpdated { .. } => Procedure::MeetingsUpdate,
            Mutation::MeetingRemoved { .. } => Procedure::MeetingsRemove,
        }
    }

    pub fn invalidates(&self) -> Vec<InvalidationTarget> {
        match *self {
            Mutation::AgentCreated => vec![all(Procedure::AgentsGetMany)],
            // Meeting details embed the agent's name.
            Mutation::AgentUpdated { id } => vec![
                all(Procedure::AgentsGetMany),
                by_id(Procedure::AgentsGetOne, id),
                all(Procedure::MeetingsGetMany),
                all(Procedure::MeetingsGetOne),
            ],
            Mutation::AgentRemoved { id } => vec![
                all(Procedure::AgentsGetMany),
                by_id(Procedure::AgentsGetOne, id),
                all(Procedure::MeetingsGetMany),
                all(Procedure::MeetingsGetOne),
            ],
            Mutation::MeetingCreated { agent_id } => vec![
                all(Procedure::MeetingsGetMany),
                all(Procedure::AgentsGetMany),
                by_id(Procedure::AgentsGetOne, agent_id),
            ],
            // The meeting's previous agent is not known here.
            Mutation::MeetingUpdated { id } | Mutation::MeetingRemoved { id } => vec![
                all(Procedure::MeetingsGetMany),
                by_id(Procedure::MeetingsGetOne, id),
                all(Procedure::AgentsGetMany),
                all(Procedure::AgentsGetOne),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convene_api::{IdInput, ProcedureKind};
    use convene_core::new_entity_id;

    fn one(procedure: Procedure, id: EntityId) -> QueryKey {
        QueryKey::new(procedure, &IdInput::new(id)).unwrap()
    }

    fn hits(mutation: Mutation, key: &QueryKey) -> bool {
        mutation.invalidates().iter().any(|t| t.matches(key))
    }

    #[test]
    fn test_targets_only_name_queries() {
        let id = new_entity_id();
        for mutation in [
            Mutation::AgentCreated,
            Mutation::AgentUpdated { id },
            Mutation::AgentRemoved { id },
            Mutation::MeetingCreated { agent_id: id },
            Mutation::MeetingUpdated { id },
            Mutation::MeetingRemoved { id },
        ] {
            assert_eq!(mutation.procedure().kind(), ProcedureKind::Mutation);
            for target in mutation.invalidates() {
                let procedure = match target {
                    InvalidationTarget::Procedure(p) => p,
                    InvalidationTarget::Exact(key) => key.procedure,
                };
                assert_eq!(procedure.kind(), ProcedureKind::Query);
            }
        }
    }

    #[test]
    fn test_agent_create_leaves_details_alone() {
        let list = QueryKey::new(Procedure::AgentsGetMany, &serde_json::json!({})).unwrap();
        assert!(hits(Mutation::AgentCreated, &list));
        assert!(!hits(
            Mutation::AgentCreated,
            &one(Procedure::AgentsGetOne, new_entity_id())
        ));
    }

    #[test]
    fn test_agent_update_hits_its_detail_and_meeting_queries() {
        let id = new_entity_id();
        let mutation = Mutation::AgentUpdated { id };
        assert!(hits(mutation, &one(Procedure::AgentsGetOne, id)));
        assert!(!hits(mutation, &one(Procedure::AgentsGetOne, new_entity_id())));
        assert!(hits(mutation, &one(Procedure::MeetingsGetOne, new_entity_id())));
        let meetings = QueryKey::new(Procedure::MeetingsGetMany, &serde_json::json!({})).unwrap();
        assert!(hits(mutation, &meetings));
    }

    #[test]
    fn test_agent_remove_hits_every_meeting_query() {
        let id = new_entity_id();
        let mutation = Mutation::AgentRemoved { id };
        assert!(hits(mutation, &one(Procedure::AgentsGetOne, id)));
        assert!(hits(mutation, &one(Procedure::MeetingsGetOne, new_entity_id())));
        assert!(!hits(mutation, &one(Procedure::AgentsGetOne, new_entity_id())));
    }

    #[test]
    fn test_meeting_create_refreshes_its_agent() {
        let agent_id = new_entity_id();
        let mutation = Mutation::MeetingCreated { agent_id };
        assert!(hits(mutation, &one(Procedure::AgentsGetOne, agent_id)));
        assert!(!hits(mutation, &one(Procedure::AgentsGetOne, new_entity_id())));
        assert!(!hits(mutation, &one(Procedure::MeetingsGetOne, new_entity_id())));
    }

    #[test]
    fn test_meeting_update_and_remove_refresh_every_agent() {
        let id = new_entity_id();
        for mutation in [Mutation::MeetingUpdated { id }, Mutation::MeetingRemoved { id }] {
            assert!(hits(mutation, &one(Procedure::MeetingsGetOne, id)));
            assert!(!hits(mutation, &one(Procedure::MeetingsGetOne, new_entity_id())));
            assert!(hits(mutation, &one(Procedure::AgentsGetOne, new_entity_id())));
        }
    }
}
