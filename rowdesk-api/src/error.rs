//! Error Types for the rowdesk HTTP layer
//!
//! Most panel failures never reach this type: the controller turns them into
//! flash messages and redirects. `ApiError` covers what is left, namely
//! startup failures, health probes and unexpected internal errors, and
//! renders them as JSON with a matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rowdesk_core::PanelError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error categories, each mapped to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// Request lacks a logged-in session or submitted wrong credentials
    Unauthorized,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// Table name is not an identifier or not allowlisted
    InvalidTableName,

    /// Nothing to export
    EmptyExportSet,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Remote table could not be queried
    TableNotFound,

    // ========================================================================
    // Server Errors (500, 502, 503)
    // ========================================================================
    /// Remote service rejected a write
    DatabaseError,

    /// Remote service could not be reached
    ServiceUnavailable,

    /// Workbook generation failed
    ExportFailed,

    /// Configuration is missing or malformed
    ConfigurationError,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,

            ErrorCode::InvalidInput | ErrorCode::InvalidTableName | ErrorCode::EmptyExportSet => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::TableNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DatabaseError => StatusCode::BAD_GATEWAY,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::ExportFailed | ErrorCode::ConfigurationError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error returned by non-redirect endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<PanelError> for ApiError {
    fn from(err: PanelError) -> Self {
        let code = match &err {
            PanelError::InvalidCredentials => ErrorCode::Unauthorized,
            PanelError::TableNotFound { .. } => ErrorCode::TableNotFound,
            PanelError::DatabaseOperationFailed { .. } => ErrorCode::DatabaseError,
            PanelError::FilterIndexOutOfRange { .. } => ErrorCode::InvalidInput,
            PanelError::EmptyExportSet { .. } => ErrorCode::EmptyExportSet,
            PanelError::MissingConfiguration { .. } | PanelError::InvalidConfiguration { .. } => {
                ErrorCode::ConfigurationError
            }
            PanelError::InvalidTableName { .. } => ErrorCode::InvalidTableName,
            PanelError::GatewayUnreachable { .. } => ErrorCode::ServiceUnavailable,
            PanelError::ExportFailed { .. } => ErrorCode::ExportFailed,
        };
        ApiError::new(code, err.to_string())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidTableName.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::TableNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::DatabaseError.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_panel_error() {
        let err = ApiError::from(PanelError::table_not_found("orders"));
        assert_eq!(err.code, ErrorCode::TableNotFound);
        assert_eq!(err.message, "Table 'orders' does not exist!");

        let err = ApiError::from(PanelError::missing_configuration("ROWDESK_REMOTE_KEY"));
        assert_eq!(err.code, ErrorCode::ConfigurationError);
        assert!(err.message.contains("ROWDESK_REMOTE_KEY"));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::from(PanelError::GatewayUnreachable {
            reason: "Remote service unreachable".to_string(),
        });
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("SERVICE_UNAVAILABLE"));
        assert!(json.contains("Remote service unreachable"));

        let back: ApiError = serde_json::from_str(&json)?;
        assert_eq!(back, err);
        Ok(())
    }
}
