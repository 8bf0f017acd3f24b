//! Convene API Server Entry Point
//!
//! Loads configuration, applies the schema and starts the Axum HTTP server.

use std::sync::Arc;

use convene_api::telemetry::{init_tracing, TelemetryConfig};
use convene_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, DbClient, DbConfig,
    JwtSessionAuthority,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    db.migrate().await?;

    let state = AppState::new(Arc::new(db), Arc::new(JwtSessionAuthority::new(auth_config)));
    let app = create_api_router(state, &api_config)?;

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Convene API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
