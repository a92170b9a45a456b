//! Grid query error types.

use thiserror::Error;

/// Errors raised while compiling or executing a grid request.
///
/// Compilation errors abort the whole request: a builder is either fully
/// compiled or not constructed at all.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid column reference: {column}")]
    InvalidColumnReference { column: String },

    #[error("unknown filter type: {0}")]
    UnknownFilterType(String),

    #[error("unsupported filter operation on column {column}: {reason}")]
    UnsupportedFilterOperation { column: String, reason: String },

    #[error("invalid filter value for column {column}: {reason}")]
    InvalidFilterValue { column: String, reason: String },

    #[error("set values requested without a column")]
    MissingColumnForSetValues,

    #[error("column is not allowed for set values: {0}")]
    UnauthorizedSetFilterColumn(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl GridError {
    pub(crate) fn invalid_column(column: impl Into<String>) -> Self {
        GridError::InvalidColumnReference {
            column: column.into(),
        }
    }

    pub(crate) fn invalid_value(column: &str, reason: impl Into<String>) -> Self {
        GridError::InvalidFilterValue {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error stems from the request itself rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, GridError::Database(_) | GridError::Schema(_))
    }
}

#[cfg(feature = "axum")]
mod http {
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};

    use super::GridError;

    impl IntoResponse for GridError {
        fn into_response(self) -> Response {
            let status = match &self {
                GridError::UnauthorizedSetFilterColumn(_) => StatusCode::FORBIDDEN,
                GridError::UnknownEntity(_) => StatusCode::NOT_FOUND,
                GridError::Database(_) | GridError::Schema(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };

            // Store failures stay vague; request errors are echoed back.
            let body = match &self {
                GridError::Database(e) => {
                    tracing::error!(error = %e, "database error");
                    "internal server error".to_string()
                }
                GridError::Schema(e) => {
                    tracing::error!(error = %e, "schema error");
                    "internal server error".to_string()
                }
                _ => self.to_string(),
            };

            (status, body).into_response()
        }
    }
}

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;
