//! Convene Core - Entity Types
//!
//! Pure data structures shared by every other crate in the workspace:
//! entity rows, pagination arithmetic and the storage error taxonomy.
//! This crate contains no persistence or transport logic.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod entities;
pub mod error;
pub mod pagination;

pub use entities::{Agent, AgentDetail, AgentSummary, EntityType, Meeting, MeetingDetail};
pub use error::{ConfigError, ConveneError, ConveneResult, StorageError, StorageResult};
pub use pagination::{
    total_pages, Page, PageRequest, PageWindow, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
    MIN_PAGE_SIZE,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Owner identifier as issued by the authentication provider.
///
/// Opaque to this system; compared for equality only.
pub type UserId = String;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Parse a client-supplied identifier.
///
/// Returns `None` for anything that is not a UUID. Callers treat that the
/// same as a missing row, since no stored entity can carry such an id.
pub fn parse_entity_id(raw: &str) -> Option<EntityId> {
    Uuid::parse_str(raw.trim()).ok()
}
