//! Shared application state for Axum routers.

use std::sync::Arc;

use rowdesk_core::TableGateway;

use crate::config::PanelConfig;
use crate::controller::DashboardController;
use crate::session::SessionStore;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub controller: DashboardController,
    pub sessions: SessionStore,
    pub config: Arc<PanelConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(gateway: Arc<dyn TableGateway>, config: PanelConfig) -> Self {
        let config = Arc::new(config);
        Self {
            controller: DashboardController::new(gateway, config.clone()),
            sessions: SessionStore::new(config.session_ttl),
            config,
            start_time: std::time::Instant::now(),
        }
    }
}
