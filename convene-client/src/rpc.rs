//! Procedure transport over HTTP.

use convene_api::{ApiError, Procedure, ProcedureKind, RpcFailure, RpcSuccess};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ClientError, ClientResult};

#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RpcClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let auth_header = build_auth_headers(config.session_token.as_deref())?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    /// The same client with no session attached.
    pub fn without_session(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth_header: HeaderMap::new(),
        }
    }

    pub fn has_session(&self) -> bool {
        self.auth_header.contains_key(AUTHORIZATION)
    }

    pub fn endpoint(&self, procedure: Procedure) -> String {
        format!("{}/api/trpc/{}", self.base_url, procedure.path())
    }

    /// Call a query procedure: GET with the JSON input in `?input=`.
    pub async fn query<I, O>(&self, procedure: Procedure, input: &I) -> ClientResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        expect_kind(procedure, ProcedureKind::Query)?;
        let input = serde_json::to_string(input)?;
        tracing::debug!(procedure = %procedure, "Sending query");

        let response = self
            .client
            .get(self.endpoint(procedure))
            .headers(self.auth_header.clone())
            .query(&[("input", input)])
            .send()
            .await?;
        read_envelope(response).await
    }

    /// Call a mutation procedure: POST with a JSON body.
    pub async fn mutate<I, O>(&self, procedure: Procedure, input: &I) -> ClientResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        expect_kind(procedure, ProcedureKind::Mutation)?;
        tracing::debug!(procedure = %procedure, "Sending mutation");

        let response = self
            .client
            .post(self.endpoint(procedure))
            .headers(self.auth_header.clone())
            .json(input)
            .send()
            .await?;
        read_envelope(response).await
    }
}

fn expect_kind(procedure: Procedure, kind: ProcedureKind) -> ClientResult<()> {
    if procedure.kind() == kind {
        Ok(())
    } else {
        Err(ClientError::InvalidRequest(format!(
            "{} is not a {:?}",
            procedure, kind
        )))
    }
}

fn build_auth_headers(session_token: Option<&str>) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = session_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|e| {
            ConfigError::InvalidValue {
                field: "session_token",
                reason: e.to_string(),
            }
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

async fn read_envelope<O: DeserializeOwned>(response: reqwest::Response) -> ClientResult<O> {
    let status = response.status();
    let body = response.bytes().await?;
    decode_envelope(status, &body)
}

/// Turn a response body into the procedure output or its error.
pub fn decode_envelope<O: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ClientResult<O> {
    if status.is_success() {
        let envelope: RpcSuccess<O> = serde_json::from_slice(body)?;
        return Ok(envelope.result.data);
    }
    if let Ok(failure) = serde_json::from_slice::<RpcFailure>(body) {
        let error: ApiError = failure.into_error();
        tracing::debug!(code = %error.code, message = %error.message, "Procedure failed");
        return Err(ClientError::Rpc(error));
    }
    Err(ClientError::InvalidResponse(format!(
        "HTTP {}: {}",
        status.as_u16(),
        String::from_utf8_lossy(body)
    )))
}
