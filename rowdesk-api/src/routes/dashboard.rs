//! Dashboard view and write actions.
//!
//! Reads render the active table. Writes dispatch one action and redirect
//! back to the table view, so a reload never repeats a mutation.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use rowdesk_core::{FilterCriterion, TableName};
use serde::Deserialize;

use crate::flash::Flash;
use crate::middleware::AdminSession;
use crate::state::AppState;
use crate::views;

/// Query parameters shared by the dashboard and export routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQuery {
    pub table: Option<String>,
    pub filter_col_index: Option<String>,
    pub filter_search_value: Option<String>,
}

impl TableQuery {
    pub fn criterion(&self) -> FilterCriterion {
        FilterCriterion::from_params(
            self.filter_col_index.as_deref(),
            self.filter_search_value.as_deref(),
        )
    }
}

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

/// GET /dashboard
pub async fn show(
    State(state): State<AppState>,
    admin: AdminSession,
    Query(query): Query<TableQuery>,
) -> Response {
    render(&state, &admin, query.table.as_deref(), &query).await
}

/// GET /dashboard/:table
pub async fn show_table(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(table): Path<String>,
    Query(query): Query<TableQuery>,
) -> Response {
    render(&state, &admin, Some(&table), &query).await
}

/// POST /dashboard
pub async fn mutate(
    State(state): State<AppState>,
    admin: AdminSession,
    Query(query): Query<TableQuery>,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    apply(&state, &admin, query.table.as_deref(), &form).await
}

/// POST /dashboard/:table
pub async fn mutate_table(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(table): Path<String>,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    apply(&state, &admin, Some(&table), &form).await
}

/// Redirect target for `table`'s dashboard view.
pub fn dashboard_location(table: &TableName, criterion: Option<&FilterCriterion>) -> String {
    format!("/dashboard?{}", views::table_query(table, criterion))
}

async fn render(
    state: &AppState,
    admin: &AdminSession,
    requested: Option<&str>,
    query: &TableQuery,
) -> Response {
    let controller = &state.controller;
    let listing = controller.list_tables().await;

    let table = match controller.resolve_table(requested, &listing) {
        Ok(table) => table,
        Err(err) => {
            tracing::debug!(error = %err, "Rejected table name");
            state.sessions.push_flash(admin.session, Flash::from(&err));
            return Redirect::to("/dashboard").into_response();
        }
    };

    let data = controller
        .load_dashboard(listing, table, query.criterion())
        .await;
    for notice in &data.notices {
        state.sessions.push_flash(admin.session, notice.clone());
    }

    let flashes = state.sessions.take_flashes(admin.session);
    Html(views::render_dashboard(&data, &admin.username, &flashes)).into_response()
}

async fn apply(
    state: &AppState,
    admin: &AdminSession,
    requested: Option<&str>,
    form: &[(String, String)],
) -> Response {
    let controller = &state.controller;

    let table = match requested.filter(|name| !name.trim().is_empty()) {
        Some(name) => controller.config().table_policy.resolve(name),
        None => {
            let listing = controller.list_tables().await;
            controller.resolve_table(None, &listing)
        }
    };
    let table = match table {
        Ok(table) => table,
        Err(err) => {
            tracing::debug!(error = %err, "Rejected table name");
            state.sessions.push_flash(admin.session, Flash::from(&err));
            return Redirect::to("/dashboard").into_response();
        }
    };

    if let Some(flash) = controller.dispatch(&table, form).await {
        state.sessions.push_flash(admin.session, flash);
    }
    Redirect::to(&dashboard_location(&table, None)).into_response()
}
