//! HTTP routes.
//!
//! - `/api/trpc/:path` - the procedure endpoint (session enforced per procedure)
//! - `/health/*` - liveness and readiness
//! - `/metrics` - Prometheus scrape target

pub mod health;
pub mod rpc;

use std::time::Duration;

use axum::{
    http::{header, request::Parts, HeaderValue, Method},
    middleware::from_fn,
    routing::{any, get},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ApiConfig;
use crate::constants::RPC_BASE_PATH;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow any origin (development). Otherwise only configured
/// origins, including `*.domain` wildcards, are echoed back.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        return cors.allow_origin(Any);
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
    let allowed = config.clone();
    let cors = cors.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin
                .to_str()
                .map(|o| allowed.is_origin_allowed(o))
                .unwrap_or(false)
        },
    ));

    if config.cors_allow_credentials {
        cors.allow_credentials(true)
    } else {
        cors
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - answers preflight requests
/// 2. Observability - spans, metrics, completion log
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> ApiResult<Router> {
    api_config.validate_for_production()?;

    let rpc_routes = Router::new()
        .route(&format!("{}/:path", RPC_BASE_PATH), any(rpc::handle))
        .with_state(state.clone());

    let router = Router::new()
        .merge(rpc_routes)
        .nest(
            "/health",
            health::create_router(state.store().clone(), state.start_time),
        )
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(api_config));

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_builds_for_both_modes() {
        let _ = build_cors_layer(&ApiConfig::default());
        let _ = build_cors_layer(&ApiConfig {
            cors_origins: vec!["https://app.convene.run".to_string()],
            cors_allow_credentials: true,
            ..ApiConfig::default()
        });
    }
}
