//! Error types for the client data layer.

use convene_api::{ApiError, ErrorCode};

use crate::config::ConfigError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with an error envelope.
    #[error("{}: {}", .0.code, .0.message)]
    Rpc(ApiError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Query cache lock poisoned")]
    LockPoisoned,
}

impl ClientError {
    /// Procedure error code, when the server produced one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Rpc(err) => Some(err.code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some(ErrorCode::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        ClientError::Rpc(err)
    }
}
