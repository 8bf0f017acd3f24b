//! Convene API - Procedure Layer and HTTP Transport
//!
//! Exposes the agents and meetings procedures over a single JSON endpoint.
//! Every procedure sits behind the session gate; persistence goes through the
//! `Store` trait, implemented here for PostgreSQL.

pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod procedures;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    extract_session_token, issue_session_token, validate_session_token, AuthConfig, Claims,
    JwtSessionAuthority, Session, SessionAuthority,
};
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use envelope::{RpcFailure, RpcSuccess};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{protected_procedure, ProcedureContext, ProtectedContext};
pub use procedures::{Procedure, ProcedureKind, ProcedureRouter};
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
