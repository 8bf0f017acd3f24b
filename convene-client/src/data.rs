//! Typed procedure calls backed by the query cache.

use std::sync::Arc;

use convene_api::{
    CreateAgentInput, CreateMeetingInput, GetManyAgentsInput, GetManyMeetingsInput, IdInput,
    Procedure, ProcedureKind, UpdateAgentInput, UpdateMeetingInput,
};
use convene_core::{Agent, AgentDetail, EntityId, Meeting, MeetingDetail, Page};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cache::{DehydratedState, QueryCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::invalidation::Mutation;
use crate::query::{InvalidationTarget, QueryKey};
use crate::rpc::RpcClient;

/// Dashboard data access for one session.
///
/// Queries read through the cache. Mutations go straight to the server and,
/// once they succeed, drop whatever the invalidation table names. A failed
/// mutation leaves the cache untouched.
#[derive(Clone)]
pub struct DataClient {
    rpc: RpcClient,
    cache: Arc<QueryCache>,
}

impl DataClient {
    pub fn new(rpc: RpcClient, cache: Arc<QueryCache>) -> Self {
        Self { rpc, cache }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let rpc = RpcClient::new(config)?;
        let cache = Arc::new(QueryCache::new(config.stale_time()));
        Ok(Self::new(rpc, cache))
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    // ========================================================================
    // AGENTS
    // ========================================================================

    pub async fn agent(&self, id: EntityId) -> ClientResult<AgentDetail> {
        self.fetch(Procedure::AgentsGetOne, &IdInput::new(id)).await
    }

    pub async fn agents(&self, input: &GetManyAgentsInput) -> ClientResult<Page<AgentDetail>> {
        self.fetch(Procedure::AgentsGetMany, input).await
    }

    pub async fn create_agent(&self, input: &CreateAgentInput) -> ClientResult<Agent> {
        self.run(Procedure::AgentsCreate, input, |_: &Agent| {
            Mutation::AgentCreated
        })
        .await
    }

    pub async fn update_agent(&self, input: &UpdateAgentInput) -> ClientResult<Agent> {
        self.run(Procedure::AgentsUpdate, input, |agent: &Agent| {
            Mutation::AgentUpdated { id: agent.id }
        })
        .await
    }

    pub async fn remove_agent(&self, id: EntityId) -> ClientResult<Agent> {
        self.run(Procedure::AgentsRemove, &IdInput::new(id), |agent: &Agent| {
            Mutation::AgentRemoved { id: agent.id }
        })
        .await
    }

    // ========================================================================
    // MEETINGS
    // ========================================================================

    pub async fn meeting(&self, id: EntityId) -> ClientResult<MeetingDetail> {
        self.fetch(Procedure::MeetingsGetOne, &IdInput::new(id)).await
    }

    pub async fn meetings(
        &self,
        input: &GetManyMeetingsInput,
    ) -> ClientResult<Page<MeetingDetail>> {
        self.fetch(Procedure::MeetingsGetMany, input).await
    }

    pub async fn create_meeting(&self, input: &CreateMeetingInput) -> ClientResult<Meeting> {
        self.run(Procedure::MeetingsCreate, input, |meeting: &Meeting| {
            Mutation::MeetingCreated {
                agent_id: meeting.agent_id,
            }
        })
        .await
    }

    pub async fn update_meeting(&self, input: &UpdateMeetingInput) -> ClientResult<Meeting> {
        self.run(Procedure::MeetingsUpdate, input, |meeting: &Meeting| {
            Mutation::MeetingUpdated { id: meeting.id }
        })
        .await
    }

    pub async fn remove_meeting(&self, id: EntityId) -> ClientResult<Meeting> {
        self.run(Procedure::MeetingsRemove, &IdInput::new(id), |meeting: &Meeting| {
            Mutation::MeetingRemoved { id: meeting.id }
        })
        .await
    }

    // ========================================================================
    // CACHE CONTROL
    // ========================================================================

    /// Warm the cache for a query without decoding the result.
    pub async fn prefetch(&self, procedure: Procedure, input: &Value) -> ClientResult<()> {
        if procedure.kind() != ProcedureKind::Query {
            return Err(ClientError::InvalidRequest(format!(
                "cannot prefetch mutation {}",
                procedure
            )));
        }
        self.fetch::<_, Value>(procedure, input).await?;
        Ok(())
    }

    pub fn invalidate(&self, target: &InvalidationTarget) -> ClientResult<usize> {
        self.cache.invalidate(target)
    }

    pub fn dehydrate(&self) -> ClientResult<DehydratedState> {
        self.cache.dehydrate()
    }

    pub fn hydrate(&self, state: DehydratedState) -> ClientResult<usize> {
        self.cache.hydrate(state)
    }

    /// End the session: drop every cached result and the credentials.
    pub fn logout(&mut self) -> ClientResult<()> {
        self.cache.clear()?;
        self.rpc = self.rpc.without_session();
        tracing::info!("Session cleared");
        Ok(())
    }

    async fn fetch<I, O>(&self, procedure: Procedure, input: &I) -> ClientResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let key = QueryKey::new(procedure, input)?;
        if let Some(data) = self.cache.get_fresh(&key)? {
            tracing::debug!(procedure = %procedure, "Query served from cache");
            return Ok(serde_json::from_value(data)?);
        }

        let data: Value = self.rpc.query(procedure, input).await?;
        self.cache.set(key, data.clone())?;
        Ok(serde_json::from_value(data)?)
    }

    async fn run<I, O, F>(&self, procedure: Procedure, input: &I, describe: F) -> ClientResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
        F: FnOnce(&O) -> Mutation,
    {
        let output: O = self.rpc.mutate(procedure, input).await?;
        let mutation = describe(&output);
        let dropped = self.cache.invalidate_all(&mutation.invalidates())?;
        tracing::debug!(
            procedure = %mutation.procedure(),
            dropped,
            "Invalidated cached queries"
        );
        Ok(output)
    }
}
