//! Constants for the Convene API
//!
//! Pagination limits are defined in convene-core and re-exported here so
//! every layer agrees on them.

pub use convene_core::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};

// ============================================================================
// TRANSPORT
// ============================================================================

/// Mount point of the procedure endpoint.
pub const RPC_BASE_PATH: &str = "/api/trpc";

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Default session token lifetime in seconds (7 days)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 3600;

/// Default JWT clock skew tolerance in seconds
pub const DEFAULT_JWT_CLOCK_SKEW_SECS: i64 = 60;

/// Minimum required length for JWT secret keys
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Cookie carrying the session token for browser callers
pub const DEFAULT_SESSION_COOKIE: &str = "convene.session_token";

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;
