//! rowdesk API - HTML admin panel over a remote table service
//!
//! An operator logs in with the configured admin account, then browses,
//! filters, edits and exports rows of tables served by a PostgREST-compatible
//! service. Every read and write goes straight to the remote service; the
//! only local state is the session store.

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod flash;
pub mod gateway;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod views;

pub use auth::AdminCredentials;
pub use config::{OutOfRangePolicy, PanelConfig, RemoteConfig};
pub use controller::{DashboardController, DashboardData, ExportFile, TableListing};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use flash::{Flash, FlashLevel};
pub use gateway::RestGateway;
pub use routes::create_router;
pub use session::{SessionId, SessionStore, SESSION_COOKIE};
pub use state::AppState;
