//! Remote table gateway
//!
//! [`TableGateway`] is the boundary between the panel and the database
//! service. The API crate provides the REST implementation; this crate
//! provides [`InMemoryGateway`] for tests and demo mode.

mod memory;

pub use memory::InMemoryGateway;

use crate::error::{PanelError, RowOperation};
use crate::row::{FieldMap, RowId, RowSet};
use crate::table::TableName;
use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the remote service.
///
/// "Could not reach the service" and "the service said no" are kept apart so
/// an outage is never reported as a missing table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("remote service unreachable: {0}")]
    Unreachable(String),

    #[error("remote service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response from remote service: {0}")]
    Decode(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_))
    }

    /// Map onto the panel taxonomy for an operation against `table`.
    pub fn into_panel_error(self, operation: RowOperation, table: &TableName) -> PanelError {
        match (self, operation) {
            (GatewayError::Unreachable(reason), _) => PanelError::GatewayUnreachable { reason },
            (_, RowOperation::Select) => PanelError::table_not_found(table.as_str()),
            (err, operation) => PanelError::DatabaseOperationFailed {
                operation,
                table: table.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

/// Row-level access to remote tables.
///
/// Implementations perform no existence checks before mutating: updating or
/// deleting an absent id succeeds without effect, as the REST service does.
#[async_trait]
pub trait TableGateway: Send + Sync {
    /// Names of the tables the remote enumeration procedure reports.
    async fn list_tables(&self) -> GatewayResult<Vec<String>>;

    /// Every row of `table`, all columns.
    async fn fetch_all(&self, table: &TableName) -> GatewayResult<RowSet>;

    async fn insert(&self, table: &TableName, fields: &FieldMap) -> GatewayResult<()>;

    /// Update the row whose primary key equals `id`.
    async fn update(&self, table: &TableName, id: RowId, fields: &FieldMap) -> GatewayResult<()>;

    /// Delete the row whose primary key equals `id`.
    async fn delete(&self, table: &TableName, id: RowId) -> GatewayResult<()>;
}
