//! rowdesk Server Entry Point
//!
//! Loads configuration, picks the gateway and starts the Axum HTTP server.
//! `--demo` swaps the remote service for seeded in-memory tables.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rowdesk_api::gateway::demo_gateway;
use rowdesk_api::telemetry::{init_tracing, TelemetryConfig};
use rowdesk_api::{
    create_router, ApiError, ApiResult, AppState, PanelConfig, RemoteConfig, RestGateway,
};
use rowdesk_core::TableGateway;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let demo = std::env::args().skip(1).any(|arg| arg == "--demo");

    let config = PanelConfig::from_env().map_err(fatal)?;
    if config.credentials.is_insecure_default() {
        tracing::warn!(
            "Using the default admin credentials; set ROWDESK_ADMIN_USERNAME and \
             ROWDESK_ADMIN_PASSWORD_SHA256"
        );
    }

    let gateway: Arc<dyn TableGateway> = if demo {
        tracing::info!("Demo mode: serving seeded in-memory tables");
        Arc::new(demo_gateway())
    } else {
        let remote = RemoteConfig::from_env().map_err(fatal)?;
        tracing::info!(base_url = remote.base_url.as_str(), "Using remote table service");
        Arc::new(RestGateway::new(&remote).map_err(fatal)?)
    };

    let state = AppState::new(gateway, config);
    spawn_session_purge(state.clone());
    let app = create_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting rowdesk server");

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

fn fatal(err: rowdesk_core::PanelError) -> ApiError {
    tracing::error!(error = %err, "Invalid configuration");
    ApiError::from(err)
}

fn spawn_session_purge(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = state.sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(
                    purged,
                    remaining = state.sessions.len(),
                    "Purged expired sessions"
                );
            }
        }
    });
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("ROWDESK_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("ROWDESK_PORT").ok())
        .unwrap_or_else(|| "5000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
