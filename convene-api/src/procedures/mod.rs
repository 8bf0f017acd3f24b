//! Procedure registry and dispatch.
//!
//! Procedures are addressed as `<router>.<procedure>`. Queries are read-only
//! and served over GET; mutations are served over POST.

pub mod agents;
pub mod meetings;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use convene_storage::Store;

use crate::auth::SessionAuthority;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::middleware::{protected_procedure, ProcedureContext, ProtectedContext};
use crate::validation::Validate;

/// Whether a procedure reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

/// Every procedure the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Procedure {
    AgentsGetOne,
    AgentsGetMany,
    AgentsCreate,
    AgentsUpdate,
    AgentsRemove,
    MeetingsGetOne,
    MeetingsGetMany,
    MeetingsCreate,
    MeetingsUpdate,
    MeetingsRemove,
}

impl Procedure {
    pub const ALL: [Procedure; 10] = [
        Procedure::AgentsGetOne,
        Procedure::AgentsGetMany,
        Procedure::AgentsCreate,
        Procedure::AgentsUpdate,
        Procedure::AgentsRemove,
        Procedure::MeetingsGetOne,
        Procedure::MeetingsGetMany,
        Procedure::MeetingsCreate,
        Procedure::MeetingsUpdate,
        Procedure::MeetingsRemove,
    ];

    /// Dotted path used on the wire.
    pub fn path(&self) -> &'static str {
        match self {
            Procedure::AgentsGetOne => "agents.getOne",
            Procedure::AgentsGetMany => "agents.getMany",
            Procedure::AgentsCreate => "agents.create",
            Procedure::AgentsUpdate => "agents.update",
            Procedure::AgentsRemove => "agents.remove",
            Procedure::MeetingsGetOne => "meetings.getOne",
            Procedure::MeetingsGetMany => "meetings.getMany",
            Procedure::MeetingsCreate => "meetings.create",
            Procedure::MeetingsUpdate => "meetings.update",
            Procedure::MeetingsRemove => "meetings.remove",
        }
    }

    pub fn kind(&self) -> ProcedureKind {
        match self {
            Procedure::AgentsGetOne
            | Procedure::AgentsGetMany
            | Procedure::MeetingsGetOne
            | Procedure::MeetingsGetMany => ProcedureKind::Query,
            Procedure::AgentsCreate
            | Procedure::AgentsUpdate
            | Procedure::AgentsRemove
            | Procedure::MeetingsCreate
            | Procedure::MeetingsUpdate
            | Procedure::MeetingsRemove => ProcedureKind::Mutation,
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Error for a path that names no procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProcedure(pub String);

impl fmt::Display for UnknownProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown procedure: {}", self.0)
    }
}

impl std::error::Error for UnknownProcedure {}

impl FromStr for Procedure {
    type Err = UnknownProcedure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Procedure::ALL
            .into_iter()
            .find(|p| p.path() == s)
            .ok_or_else(|| UnknownProcedure(s.to_string()))
    }
}

impl Serialize for Procedure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.path())
    }
}

impl<'de> Deserialize<'de> for Procedure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Decode and validate a procedure input. `null` means "no input".
pub fn parse_input<T>(input: Value) -> ApiResult<T>
where
    T: DeserializeOwned + Validate,
{
    let input = match input {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    let parsed: T = serde_path_to_error::deserialize(input).map_err(input_error)?;
    parsed.validate()?;
    Ok(parsed)
}

/// A decode failure, reported under the field it happened in when there is one.
fn input_error(err: serde_path_to_error::Error<serde_json::Error>) -> ApiError {
    let field = err.path().to_string();
    let message = err.inner().to_string();
    if field.is_empty() || field == "." {
        return ApiError::bad_request(format!("Invalid input: {}", message));
    }
    let mut field_errors = BTreeMap::new();
    field_errors.insert(field, vec![message]);
    ApiError::validation_failed(field_errors)
}

/// Decode transport bytes as JSON. Blank input means no input.
pub fn decode_raw_input(raw: &[u8]) -> ApiResult<Value> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw).map_err(|e| {
        ApiError::parse_error(ErrorCode::ParseError.default_message())
            .with_details(serde_json::json!({ "reason": e.to_string() }))
    })
}

fn to_output<T: Serialize>(output: T) -> ApiResult<Value> {
    serde_json::to_value(output).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize procedure output");
        ApiError::internal_error("Failed to serialize response")
    })
}

/// The app router: owns the collaborators every procedure needs.
#[derive(Clone)]
pub struct ProcedureRouter {
    store: Arc<dyn Store>,
    sessions: Arc<dyn SessionAuthority>,
}

impl ProcedureRouter {
    pub fn new(store: Arc<dyn Store>, sessions: Arc<dyn SessionAuthority>) -> Self {
        Self { store, sessions }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The session gate on its own.
    pub async fn authorize(&self, ctx: &ProcedureContext) -> ApiResult<ProtectedContext> {
        protected_procedure(ctx, self.sessions.as_ref()).await
    }

    /// Run one procedure with an already-decoded input.
    pub async fn call(
        &self,
        procedure: Procedure,
        ctx: ProcedureContext,
        input: Value,
    ) -> ApiResult<Value> {
        let ctx = self.authorize(&ctx).await?;
        self.dispatch(procedure, &ctx, input).await
    }

    /// Run one procedure from raw transport bytes.
    ///
    /// The input is only decoded once the session gate has passed.
    pub async fn call_raw(
        &self,
        procedure: Procedure,
        ctx: ProcedureContext,
        raw: &[u8],
    ) -> ApiResult<Value> {
        let ctx = self.authorize(&ctx).await?;
        let input = decode_raw_input(raw)?;
        self.dispatch(procedure, &ctx, input).await
    }

    async fn dispatch(
        &self,
        procedure: Procedure,
        ctx: &ProtectedContext,
        input: Value,
    ) -> ApiResult<Value> {
        let store = self.store.as_ref();

        tracing::debug!(
            request_id = %ctx.request_id(),
            procedure = %procedure,
            user_id = %ctx.user_id(),
            "Dispatching procedure"
        );

        match procedure {
            Procedure::AgentsGetOne => {
                to_output(agents::get_one(ctx, store, parse_input(input)?).await?)
            }
            Procedure::AgentsGetMany => {
                to_output(agents::get_many(ctx, store, parse_input(input)?).await?)
            }
            Procedure::AgentsCreate => {
                to_output(agents::create(ctx, store, parse_input(input)?).await?)
            }
            Procedure::AgentsUpdate => {
                to_output(agents::update(ctx, store, parse_input(input)?).await?)
            }
            Procedure::AgentsRemove => {
                to_output(agents::remove(ctx, store, parse_input(input)?).await?)
            }
            Procedure::MeetingsGetOne => {
                to_output(meetings::get_one(ctx, store, parse_input(input)?).await?)
            }
            Procedure::MeetingsGetMany => {
                to_output(meetings::get_many(ctx, store, parse_input(input)?).await?)
            }
            Procedure::MeetingsCreate => {
                to_output(meetings::create(ctx, store, parse_input(input)?).await?)
            }
            Procedure::MeetingsUpdate => {
                to_output(meetings::update(ctx, store, parse_input(input)?).await?)
            }
            Procedure::MeetingsRemove => {
                to_output(meetings::remove(ctx, store, parse_input(input)?).await?)
            }
        }
    }
}
