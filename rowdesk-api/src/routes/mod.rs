//! Route Module
//!
//! Panel routes share the session middleware. Dashboard and export routes
//! additionally sit behind the admin guard. Health routes are mounted
//! separately with neither.

pub mod dashboard;
pub mod export;
pub mod health;
pub mod login;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{require_admin, session_middleware};
use crate::state::AppState;

/// Routes that require a logged-in admin.
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/dashboard", get(dashboard::show).post(dashboard::mutate))
        .route(
            "/dashboard/:table",
            get(dashboard::show_table).post(dashboard::mutate_table),
        )
        .route("/export_excel", get(export::export_excel))
        .route(
            "/export_excel_filtered_manual",
            get(export::export_filtered).post(export::export_filtered_form),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

/// Build the complete application router.
pub fn create_router(state: AppState) -> Router {
    let panel = Router::new()
        .route("/login", get(login::show).post(login::submit))
        .route("/logout", get(login::logout))
        .merge(protected_routes(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .with_state(state.clone());

    let health = health::create_router(state.controller.gateway().clone(), state.start_time);

    Router::new()
        .nest("/health", health)
        .merge(panel)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
