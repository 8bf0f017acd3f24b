//! Error types shared across the workspace.

use crate::entities::EntityType;
use thiserror::Error;

/// Persistence-layer errors.
///
/// Missing rows are not errors at this level: lookups return `Option` and the
/// procedure layer decides what absence means.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Query failed on {entity_type:?}: {reason}")]
    QueryFailed { entity_type: EntityType, reason: String },

    #[error("Storage backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Umbrella error for operations that can fail in more than one layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConveneError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Convene operations.
pub type ConveneResult<T> = Result<T, ConveneError>;
