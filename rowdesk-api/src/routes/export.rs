//! Spreadsheet downloads.
//!
//! The filtered export only takes the table and the filter criterion from
//! the request. Rows are always fetched again and filtered on the server;
//! any row data a client submits is ignored.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use rowdesk_core::{FilterCriterion, XLSX_CONTENT_TYPE};

use crate::controller::ExportFile;
use crate::flash::Flash;
use crate::middleware::AdminSession;
use crate::routes::dashboard::{dashboard_location, TableQuery};
use crate::state::AppState;

/// GET /export_excel
pub async fn export_excel(
    State(state): State<AppState>,
    admin: AdminSession,
    Query(query): Query<TableQuery>,
) -> Response {
    export(&state, &admin, query.table.as_deref(), None).await
}

/// GET /export_excel_filtered_manual
pub async fn export_filtered(
    State(state): State<AppState>,
    admin: AdminSession,
    Query(query): Query<TableQuery>,
) -> Response {
    let criterion = query.criterion();
    export(&state, &admin, query.table.as_deref(), Some(criterion)).await
}

/// POST /export_excel_filtered_manual
///
/// Form fields win over query parameters.
pub async fn export_filtered_form(
    State(state): State<AppState>,
    admin: AdminSession,
    Query(query): Query<TableQuery>,
    Form(form): Form<TableQuery>,
) -> Response {
    let merged = TableQuery {
        table: form.table.or(query.table),
        filter_col_index: form.filter_col_index.or(query.filter_col_index),
        filter_search_value: form.filter_search_value.or(query.filter_search_value),
    };
    let criterion = merged.criterion();
    export(&state, &admin, merged.table.as_deref(), Some(criterion)).await
}

async fn export(
    state: &AppState,
    admin: &AdminSession,
    requested: Option<&str>,
    criterion: Option<FilterCriterion>,
) -> Response {
    let controller = &state.controller;
    let listing = controller.list_tables().await;

    let table = match controller.resolve_table(requested, &listing) {
        Ok(table) => table,
        Err(err) => {
            state.sessions.push_flash(admin.session, Flash::from(&err));
            return Redirect::to("/dashboard").into_response();
        }
    };

    match controller.export(&table, criterion.as_ref()).await {
        Ok(file) => attachment(file),
        Err(err) => {
            tracing::info!(table = %table, error = %err, "Export refused");
            state.sessions.push_flash(admin.session, Flash::from(&err));
            Redirect::to(&dashboard_location(&table, criterion.as_ref())).into_response()
        }
    }
}

fn attachment(file: ExportFile) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}
