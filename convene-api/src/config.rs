//! API Configuration Module
//!
//! CORS and bind-address settings loaded from environment variables with
//! development-friendly defaults.

use std::net::SocketAddr;

use crate::constants::{DEFAULT_BIND_HOST, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_PORT};
use crate::error::{ApiError, ApiResult};

/// Returns true when `CONVENE_ENVIRONMENT` names a production deployment.
pub fn is_production_environment() -> bool {
    let environment = std::env::var("CONVENE_ENVIRONMENT")
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase();
    environment == "production" || environment == "prod"
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP-facing configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials (session cookies) in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Host to bind.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CONVENE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CONVENE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `CONVENE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `CONVENE_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `CONVENE_API_PORT`: Listen port (default: 3000)
    pub fn from_env() -> ApiResult<Self> {
        let cors_origins = std::env::var("CONVENE_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("CONVENE_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("CONVENE_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        let bind_host =
            std::env::var("CONVENE_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("CONVENE_API_PORT").ok())
        {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ApiError::internal_error(format!("Invalid port value: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            bind_host,
            port,
        })
    }

    /// Resolve the socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::internal_error(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Refuse permissive CORS when deployed to production.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.cors_origins.is_empty() {
            if is_production_environment() {
                return Err(ApiError::internal_error(
                    "Cannot start server in production with CORS open to all origins. \
                     Set CONVENE_CORS_ORIGINS.",
                ));
            }
            tracing::warn!("CORS allows all origins; set CONVENE_CORS_ORIGINS before deploying");
        }
        Ok(())
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.convene.run
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
