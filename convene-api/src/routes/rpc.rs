//! The procedure endpoint.
//!
//! One route serves every procedure: `/api/trpc/{router}.{procedure}`.
//! Queries take their JSON input from the `input` query parameter on GET;
//! mutations take it from the POST body.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::envelope::{RpcFailure, RpcSuccess};
use crate::error::{ApiError, ApiResult};
use crate::middleware::ProcedureContext;
use crate::procedures::{Procedure, ProcedureKind, ProcedureRouter};
use crate::telemetry::METRICS;

/// Query string accepted by the endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RpcQuery {
    /// URL-encoded JSON input for queries.
    pub input: Option<String>,
}

fn record_outcome(procedure: &str, outcome: &ApiResult<serde_json::Value>) {
    if let Ok(metrics) = METRICS.as_ref() {
        let code = match outcome {
            Ok(_) => "OK",
            Err(err) => err.code.as_str(),
        };
        metrics.record_procedure_call(procedure, code);
    }
}

fn expected_method(kind: ProcedureKind) -> Method {
    match kind {
        ProcedureKind::Query => Method::GET,
        ProcedureKind::Mutation => Method::POST,
    }
}

/// Handler for every method on `/api/trpc/:path`.
pub async fn handle(
    State(procedures): State<ProcedureRouter>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<RpcQuery>, QueryRejection>,
    body: Bytes,
) -> Response {
    let Ok(procedure) = path.parse::<Procedure>() else {
        let outcome = Err(ApiError::procedure_not_found(&path));
        record_outcome("unknown", &outcome);
        return respond(outcome, &path);
    };

    if method != expected_method(procedure.kind()) {
        let outcome = Err(ApiError::method_not_supported(method.as_str(), &path));
        record_outcome(procedure.path(), &outcome);
        return respond(outcome, &path);
    }

    let ctx = ProcedureContext::new(headers);
    let request_id = ctx.request_id;

    let outcome = match procedure.kind() {
        ProcedureKind::Query => match query {
            Ok(Query(q)) => {
                let raw = q.input.unwrap_or_default();
                procedures.call_raw(procedure, ctx, raw.as_bytes()).await
            }
            // Still gated: without a session this is UNAUTHORIZED.
            Err(rejection) => match procedures.authorize(&ctx).await {
                Ok(_) => Err(ApiError::parse_error(rejection.body_text())),
                Err(err) => Err(err),
            },
        },
        ProcedureKind::Mutation => procedures.call_raw(procedure, ctx, &body).await,
    };
    record_outcome(procedure.path(), &outcome);

    if let Err(err) = &outcome {
        tracing::debug!(
            request_id = %request_id,
            procedure = %procedure,
            code = %err.code,
            "Procedure failed"
        );
    }

    respond(outcome, procedure.path())
}

fn respond(outcome: ApiResult<serde_json::Value>, path: &str) -> Response {
    match outcome {
        Ok(data) => RpcSuccess::new(data).into_response(),
        Err(err) => RpcFailure::new(err, path).into_response(),
    }
}
