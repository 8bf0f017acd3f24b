//! Protected-procedure gate.
//!
//! Every procedure runs behind `protected_procedure`. Without a session the
//! call ends here with UNAUTHORIZED, before its input is validated and before
//! any store access. With a session the handler receives an immutable
//! `ProtectedContext`.

use axum::http::HeaderMap;
use convene_core::EntityId;
use uuid::Uuid;

use crate::auth::{Session, SessionAuthority};
use crate::error::{ApiError, ApiResult};

/// Per-call context built by the transport.
#[derive(Debug, Clone)]
pub struct ProcedureContext {
    /// Correlates log lines for one call.
    pub request_id: EntityId,
    pub headers: HeaderMap,
}

impl ProcedureContext {
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            headers,
        }
    }
}

/// Context handed to protected handlers. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ProtectedContext {
    request_id: EntityId,
    auth: Session,
}

impl ProtectedContext {
    pub fn new(request_id: EntityId, auth: Session) -> Self {
        Self { request_id, auth }
    }

    pub fn request_id(&self) -> EntityId {
        self.request_id
    }

    /// The session that authorized this call.
    pub fn auth(&self) -> &Session {
        &self.auth
    }

    /// Owner id stamped on created rows and used to scope every query.
    pub fn user_id(&self) -> &str {
        &self.auth.user_id
    }
}

/// Resolve the session or reject the call.
pub async fn protected_procedure(
    ctx: &ProcedureContext,
    sessions: &dyn SessionAuthority,
) -> ApiResult<ProtectedContext> {
    match sessions.get_session(&ctx.headers).await {
        Some(session) => {
            tracing::debug!(
                request_id = %ctx.request_id,
                user_id = %session.user_id,
                "Session resolved"
            );
            Ok(ProtectedContext::new(ctx.request_id, session))
        }
        None => {
            tracing::debug!(request_id = %ctx.request_id, "No session for protected procedure");
            Err(ApiError::unauthorized())
        }
    }
}
