//! rowdesk Core - Rows, Filters and Exports
//!
//! Domain layer for the rowdesk admin panel. Everything here is independent
//! of HTTP: the row model, table name validation, form action parsing, the
//! single-column filter, the spreadsheet exporter and the `TableGateway`
//! seam that the API layer implements against the remote service.

pub mod action;
pub mod error;
pub mod export;
pub mod filter;
pub mod gateway;
pub mod row;
pub mod table;

pub use action::{
    ActionError, DashboardAction, ACTION_FIELD, FIELD_NAME_FIELD, FIELD_VALUE_FIELD, ROW_ID_FIELD,
};
pub use error::{PanelError, PanelResult, RowOperation};
pub use export::{
    export_filename, export_rows, sanitize_sheet_name, Cell, SheetLayout, XLSX_CONTENT_TYPE,
};
pub use filter::{apply_filter, try_apply_filter, FilterCriterion};
pub use gateway::{GatewayError, GatewayResult, InMemoryGateway, TableGateway};
pub use row::{cell_text, column_names, row_id, FieldMap, Row, RowId, RowSet, PRIMARY_KEY};
pub use table::{TableName, TablePolicy};
