//! Error taxonomy for panel operations

use std::fmt;
use thiserror::Error;

/// Remote operation kinds, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowOperation {
    ListTables,
    Select,
    Insert,
    Update,
    Delete,
}

impl RowOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowOperation::ListTables => "list_tables",
            RowOperation::Select => "select",
            RowOperation::Insert => "insert",
            RowOperation::Update => "update",
            RowOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for RowOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every condition the panel reports to a user or refuses to start on.
///
/// `MissingConfiguration` and `InvalidConfiguration` are fatal at startup.
/// Everything else is turned into a flash notice by the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Table '{table}' does not exist!")]
    TableNotFound { table: String },

    #[error("Database operation {operation} on {table} failed: {reason}")]
    DatabaseOperationFailed {
        operation: RowOperation,
        table: String,
        reason: String,
    },

    #[error("Filter column index {index} is out of range ({columns} columns)")]
    FilterIndexOutOfRange { index: usize, columns: usize },

    #[error("No data to export for {sheet}")]
    EmptyExportSet { sheet: String },

    #[error("Missing required configuration: {field}")]
    MissingConfiguration { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    #[error("Remote service unreachable: {reason}")]
    GatewayUnreachable { reason: String },

    #[error("Spreadsheet export failed: {reason}")]
    ExportFailed { reason: String },
}

impl PanelError {
    pub fn missing_configuration(field: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            field: field.into(),
        }
    }

    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// True for errors that must stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PanelError::MissingConfiguration { .. } | PanelError::InvalidConfiguration { .. }
        )
    }
}

pub type PanelResult<T> = Result<T, PanelError>;
