//! Procedure input types.
//!
//! Every input deserializes with container-level defaults so a missing
//! required field surfaces as a field error rather than a parse failure.
//! Unknown keys (such as a client-supplied `userId`) are ignored.

use convene_core::{parse_entity_id, EntityId, PageRequest, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use convene_core::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::validation::{FieldErrors, HasUpdates, Validate, ValidateNonEmpty, ValidateRange};

// ============================================================================
// SHARED
// ============================================================================

/// `{ id }` input used by getOne and remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdInput {
    pub id: String,
}

impl IdInput {
    pub fn new(id: EntityId) -> Self {
        Self { id: id.to_string() }
    }

    /// The id as stored, or `None` if it cannot name any row.
    pub fn entity_id(&self) -> Option<EntityId> {
        parse_entity_id(&self.id)
    }
}

impl Validate for IdInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        errors.check("id", self.id.validate_non_empty("Id is required"));
        errors.into_result()
    }
}

fn check_paging(errors: &mut FieldErrors, page: Option<i64>, page_size: Option<i64>) {
    if let Some(page) = page {
        errors.check("page", page.validate_min(DEFAULT_PAGE));
    }
    if let Some(page_size) = page_size {
        errors.check("pageSize", page_size.validate_range(MIN_PAGE_SIZE, MAX_PAGE_SIZE));
    }
}

fn page_request(page: Option<i64>, page_size: Option<i64>) -> PageRequest {
    PageRequest::new(
        page.unwrap_or(DEFAULT_PAGE),
        page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
}

// ============================================================================
// AGENTS
// ============================================================================

/// Input of `agents.getMany`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetManyAgentsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl GetManyAgentsInput {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.page_size)
    }
}

impl Validate for GetManyAgentsInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_paging(&mut errors, self.page, self.page_size);
        errors.into_result()
    }
}

/// Input of `agents.create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateAgentInput {
    pub name: String,
    pub instructions: String,
}

impl Validate for CreateAgentInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        errors.check("name", self.name.validate_non_empty("Name is required"));
        errors.check(
            "instructions",
            self.instructions.validate_non_empty("Instructions is required"),
        );
        errors.into_result()
    }
}

/// Input of `agents.update`. At least one of `name`/`instructions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateAgentInput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl UpdateAgentInput {
    pub fn entity_id(&self) -> Option<EntityId> {
        parse_entity_id(&self.id)
    }
}

impl HasUpdates for UpdateAgentInput {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.instructions.is_some()
    }
}

impl Validate for UpdateAgentInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        errors.check("id", self.id.validate_non_empty("Id is required"));
        errors.check("name", self.name.validate_non_empty("Name is required"));
        errors.check(
            "instructions",
            self.instructions.validate_non_empty("Instructions is required"),
        );
        errors.into_result()?;
        self.validate_has_updates()
    }
}

// ============================================================================
// MEETINGS
// ============================================================================

/// Input of `meetings.getMany`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetManyMeetingsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Restrict to meetings held with this agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl GetManyMeetingsInput {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.page_size)
    }
}

impl Validate for GetManyMeetingsInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_paging(&mut errors, self.page, self.page_size);
        if let Some(agent_id) = self.agent_id.as_deref().filter(|s| !s.is_empty()) {
            if parse_entity_id(agent_id).is_none() {
                errors.add("agentId", "Invalid agent id");
            }
        }
        errors.into_result()
    }
}

/// Input of `meetings.create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateMeetingInput {
    pub name: String,
    pub agent_id: String,
}

impl Validate for CreateMeetingInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        errors.check("name", self.name.validate_non_empty("Name is required"));
        errors.check("agentId", self.agent_id.validate_non_empty("Agent is required"));
        errors.into_result()
    }
}

/// Input of `meetings.update`. At least one of `name`/`agentId`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateMeetingInput {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl UpdateMeetingInput {
    pub fn entity_id(&self) -> Option<EntityId> {
        parse_entity_id(&self.id)
    }
}

impl HasUpdates for UpdateMeetingInput {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.agent_id.is_some()
    }
}

impl Validate for UpdateMeetingInput {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        errors.check("id", self.id.validate_non_empty("Id is required"));
        errors.check("name", self.name.validate_non_empty("Name is required"));
        errors.check("agentId", self.agent_id.validate_non_empty("Agent is required"));
        errors.into_result()?;
        self.validate_has_updates()
    }
}
