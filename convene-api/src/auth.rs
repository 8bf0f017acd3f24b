//! Session Authority
//!
//! Resolves request headers to a session, or to nothing. The procedure gate
//! only consumes that pass/fail contract; how sessions are minted and stored
//! is the authority's business.
//!
//! The bundled `JwtSessionAuthority` accepts HS256 session tokens from either
//! `Authorization: Bearer <token>` or the session cookie.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use convene_core::{ConfigError, Timestamp, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::is_production_environment;
use crate::constants::{
    DEFAULT_JWT_CLOCK_SKEW_SECS, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_TTL_SECS,
    MIN_JWT_SECRET_LENGTH,
};
use crate::error::{ApiError, ApiResult};

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for token time validation, injectable for tests.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// Signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value for signing and verification only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };
    JwtSecret::new(normalized)
        .unwrap_or_else(|_| JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.into())))
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Session token configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// Signing algorithm (HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of issued session tokens in seconds
    pub session_ttl_secs: i64,

    /// Clock skew tolerance in seconds
    pub jwt_clock_skew_secs: i64,

    /// Name of the cookie carrying the session token
    pub session_cookie: String,

    /// Clock for token time validation
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("session_cookie", &self.session_cookie)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            jwt_clock_skew_secs: DEFAULT_JWT_CLOCK_SKEW_SECS,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create a configuration with an explicit secret.
    pub fn with_secret(secret: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: JwtSecret::new(secret)?,
            ..Self::default()
        })
    }

    /// Replace the clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn JwtClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CONVENE_JWT_SECRET`: Session token signing secret
    /// - `CONVENE_SESSION_TTL_SECS`: Issued token lifetime (default: 7 days)
    /// - `CONVENE_JWT_CLOCK_SKEW_SECS`: Clock skew tolerance (default: 60)
    /// - `CONVENE_SESSION_COOKIE`: Session cookie name (default: convene.session_token)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("CONVENE_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            session_ttl_secs: std::env::var("CONVENE_SESSION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            jwt_clock_skew_secs: std::env::var("CONVENE_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_JWT_CLOCK_SKEW_SECS),
            session_cookie: std::env::var("CONVENE_SESSION_COOKIE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Refuse insecure secrets in production; warn about them elsewhere.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let is_production = is_production_environment();

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::internal_error(
                    "Cannot start server in production with insecure JWT secret. \
                     Set CONVENE_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set CONVENE_JWT_SECRET before deploying."
            );
            return Ok(());
        }

        if self.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            if is_production {
                return Err(ApiError::internal_error(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least {} characters long.",
                    self.jwt_secret.len(),
                    MIN_JWT_SECRET_LENGTH
                )));
            }
            tracing::warn!(
                length = self.jwt_secret.len(),
                "JWT secret is short; use at least {} characters in production",
                MIN_JWT_SECRET_LENGTH
            );
        }
        Ok(())
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable identifier of the signed-in user.
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expires_at: Timestamp,
}

/// Headers in, session-or-nothing out.
///
/// Implementations must not fail loudly on bad credentials: an invalid or
/// expired token is simply "no session".
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    async fn get_session(&self, headers: &HeaderMap) -> Option<Session>;
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    /// Create new claims for a user using a clock.
    pub fn new(user_id: impl Into<String>, ttl_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: user_id.into(),
            iat: now,
            exp: now + ttl_secs,
            email: None,
            name: None,
        }
    }

    pub fn with_profile(mut self, email: Option<String>, name: Option<String>) -> Self {
        self.email = email;
        self.name = name;
        self
    }

    fn into_session(self) -> Session {
        let expires_at = DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now);
        Session {
            user_id: self.sub,
            email: self.email,
            name: self.name,
            expires_at,
        }
    }
}

// ============================================================================
// TOKEN FUNCTIONS
// ============================================================================

/// Decode a session token and check its lifetime against the configured clock.
///
/// Signature validation is delegated to `jsonwebtoken`; expiry is checked here
/// so the clock can be injected.
pub fn validate_session_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        ApiError::unauthorized().with_details(serde_json::json!({ "reason": e.to_string() }))
    })?;
    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(timestamp = now, "System clock returned pre-epoch time");
        return Err(ApiError::internal_error("Server time configuration error"));
    }
    if claims.exp < now - config.jwt_clock_skew_secs {
        return Err(ApiError::unauthorized()
            .with_details(serde_json::json!({ "reason": "session expired" })));
    }
    if claims.sub.trim().is_empty() {
        return Err(ApiError::unauthorized()
            .with_details(serde_json::json!({ "reason": "missing subject" })));
    }

    Ok(claims)
}

/// Mint a session token for a user.
pub fn issue_session_token(
    config: &AuthConfig,
    user_id: impl Into<String>,
    email: Option<String>,
    name: Option<String>,
) -> ApiResult<String> {
    let claims = Claims::new(user_id, config.session_ttl_secs, &*config.clock)
        .with_profile(email, name);
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    encode(&Header::new(config.jwt_algorithm), &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to issue session token: {}", e)))
}

/// Pull the raw session token out of the request headers.
///
/// The Authorization header wins over the cookie when both are present.
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

// ============================================================================
// JWT SESSION AUTHORITY
// ============================================================================

/// Session authority backed by signed session tokens.
#[derive(Debug, Clone)]
pub struct JwtSessionAuthority {
    config: AuthConfig,
}

impl JwtSessionAuthority {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[async_trait]
impl SessionAuthority for JwtSessionAuthority {
    async fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        let token = extract_session_token(headers, &self.config.session_cookie)?;
        match validate_session_token(&self.config, &token) {
            Ok(claims) => Some(claims.into_session()),
            Err(err) => {
                tracing::debug!(error = %err, details = ?err.details, "Session token rejected");
                None
            }
        }
    }
}
