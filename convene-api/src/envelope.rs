//! Response envelopes for the procedure endpoint.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `{"result": {"data": ...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcSuccess<T> {
    pub result: RpcResult<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResult<T> {
    pub data: T,
}

impl<T> RpcSuccess<T> {
    pub fn new(data: T) -> Self {
        Self {
            result: RpcResult { data },
        }
    }
}

impl<T: Serialize> IntoResponse for RpcSuccess<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `{"error": {"code", "message", "details"?, "path"}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcFailure {
    pub error: RpcErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    #[serde(flatten)]
    pub error: ApiError,
    /// Procedure path the error belongs to.
    pub path: String,
}

impl RpcFailure {
    pub fn new(error: ApiError, path: impl Into<String>) -> Self {
        Self {
            error: RpcErrorBody {
                error,
                path: path.into(),
            },
        }
    }

    pub fn into_error(self) -> ApiError {
        self.error.error
    }
}

impl IntoResponse for RpcFailure {
    fn into_response(self) -> Response {
        let status = self.error.error.status_code();
        (status, Json(self)).into_response()
    }
}
