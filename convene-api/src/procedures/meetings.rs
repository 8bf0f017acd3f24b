//! Meetings procedure set.
//!
//! A meeting may only reference an agent owned by the same user. A foreign
//! agent id is reported exactly like a missing one.

use chrono::Utc;
use convene_core::{new_entity_id, parse_entity_id, EntityId, Meeting, MeetingDetail, Page};
use convene_storage::{MeetingFilter, MeetingUpdate, Store};

use crate::error::{ApiError, ApiResult};
use crate::middleware::ProtectedContext;
use crate::types::{CreateMeetingInput, GetManyMeetingsInput, IdInput, UpdateMeetingInput};

/// Resolve an agent id the caller is allowed to reference.
async fn owned_agent_id(
    ctx: &ProtectedContext,
    store: &dyn Store,
    raw: &str,
) -> ApiResult<EntityId> {
    let Some(agent_id) = parse_entity_id(raw) else {
        return Err(ApiError::agent_not_found());
    };
    match store.agent_get(agent_id, ctx.user_id()).await? {
        Some(_) => Ok(agent_id),
        None => Err(ApiError::agent_not_found()),
    }
}

/// `meetings.getOne`: the caller's meeting with its agent summary.
pub async fn get_one(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: IdInput,
) -> ApiResult<MeetingDetail> {
    let Some(id) = input.entity_id() else {
        return Err(ApiError::meeting_not_found());
    };
    store
        .meeting_get(id, ctx.user_id())
        .await?
        .ok_or_else(ApiError::meeting_not_found)
}

/// `meetings.getMany`: one page of the caller's meetings, newest first.
pub async fn get_many(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: GetManyMeetingsInput,
) -> ApiResult<Page<MeetingDetail>> {
    let request = input.page_request();
    let agent_id = input.agent_id.as_deref().and_then(parse_entity_id);
    let filter = MeetingFilter::new(ctx.user_id(), input.search, agent_id);

    let items = store.meeting_list(&filter, request.window()).await?;
    let total_count = store.meeting_count(&filter).await?;

    Ok(Page::new(items, total_count, request))
}

/// `meetings.create`: insert owned by the caller, returning the new row.
pub async fn create(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: CreateMeetingInput,
) -> ApiResult<Meeting> {
    let agent_id = owned_agent_id(ctx, store, &input.agent_id).await?;

    let now = Utc::now();
    let meeting = Meeting {
        id: new_entity_id(),
        name: input.name,
        user_id: ctx.user_id().to_string(),
        agent_id,
        created_at: now,
        updated_at: now,
    };

    let created = store.meeting_insert(&meeting).await?;
    tracing::info!(
        request_id = %ctx.request_id(),
        meeting_id = %created.id,
        agent_id = %created.agent_id,
        "Meeting created"
    );
    Ok(created)
}

/// `meetings.update`: partial update, double-filtered on id and owner.
pub async fn update(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: UpdateMeetingInput,
) -> ApiResult<Meeting> {
    let Some(id) = input.entity_id() else {
        return Err(ApiError::meeting_not_found());
    };
    let agent_id = match input.agent_id.as_deref() {
        Some(raw) => Some(owned_agent_id(ctx, store, raw).await?),
        None => None,
    };
    let update = MeetingUpdate {
        name: input.name,
        agent_id,
    };

    store
        .meeting_update(id, ctx.user_id(), &update, Utc::now())
        .await?
        .ok_or_else(ApiError::meeting_not_found)
}

/// `meetings.remove`: delete and return the removed row.
pub async fn remove(
    ctx: &ProtectedContext,
    store: &dyn Store,
    input: IdInput,
) -> ApiResult<Meeting> {
    let Some(id) = input.entity_id() else {
        return Err(ApiError::meeting_not_found());
    };
    let removed = store
        .meeting_delete(id, ctx.user_id())
        .await?
        .ok_or_else(ApiError::meeting_not_found)?;

    tracing::info!(request_id = %ctx.request_id(), meeting_id = %removed.id, "Meeting removed");
    Ok(removed)
}
