//! Agents procedure set.
//!
//! Every operation is scoped to the caller: the owner id comes from the
//! session, never from the input.

use chrono::Utc;
use convene_core::{new_entity_id, Agent, AgentDetail, Page};
use convene_storage::{AgentFilter, AgentUpdate, Store};

use crate::error::{ApiError, ApiResult};
use crate::middleware::ProtectedContext;
use crate::types::{CreateAgentInput, GetManyAgentsInput, IdInput, UpdateAgentInput};

/// `agents.getOne`: the caller's agent with its meeting count.
pub async fn get_one(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: IdInput,
) -> ApiResult<AgentDetail> {
    let Some(id) = input.entity_id() else {
        return Err(ApiError::agent_not_found());
    };
    store
        .agent_get(id, ctx.user_id())
        .await?
        .ok_or_else(ApiError::agent_not_found)
}

/// `agents.getMany`: one page of the caller's agents, newest first.
pub async fn get_many(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: GetManyAgentsInput,
) -> ApiResult<Page<AgentDetail>> {
    let request = input.page_request();
    let filter = AgentFilter::new(ctx.user_id(), input.search);

    let items = store.agent_list(&filter, request.window()).await?;
    let total_count = store.agent_count(&filter).await?;

    Ok(Page::new(items, total_count, request))
}

/// `agents.create`: insert owned by the caller.
pub async fn create(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: CreateAgentInput,
) -> ApiResult<Agent> {
    let now = Utc::now();
    let agent = Agent {
        id: new_entity_id(),
        name: input.name,
        instructions: input.instructions,
        user_id: ctx.user_id().to_string(),
        created_at: now,
        updated_at: now,
    };

    let created = store.agent_insert(&agent).await?;
    tracing::info!(
        request_id = %ctx.request_id(),
        agent_id = %created.id,
        "Agent created"
    );
    Ok(created)
}

/// `agents.update`: partial update, double-filtered on id and owner.
pub async fn update(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: UpdateAgentInput,
) -> ApiResult<Agent> {
    let Some(id) = input.entity_id() else {
        return Err(ApiError::agent_not_found());
    };
    let update = AgentUpdate {
        name: input.name,
        instructions: input.instructions,
    };

    store
        .agent_update(id, ctx.user_id(), &update, Utc::now())
        .await?
        .ok_or_else(ApiError::agent_not_found)
}

/// `agents.remove`: delete (cascading to meetings) and return the removed row.
pub async fn remove(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: IdInput,
) -> ApiResult<Agent> {
    let Some(id) = input.entity_id() else {
        return Err(ApiError::agent_not_found());
    };
    let removed = store
        .agent_delete(id, ctx.user_id())
        .await?
        .ok_or_else(ApiError::agent_not_found)?;

    tracing::info!(request_id = %ctx.request_id(), agent_id = %removed.id, "Agent removed");
    Ok(removed)
}
