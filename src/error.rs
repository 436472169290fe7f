//! Error types for the data layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::batch::BatchUpdateFailure;

// == Data Error Enum ==
/// Unified error type for repository, batch and service operations.
///
/// The cache itself never produces one of these; only the layers that talk
/// to the repository do.
#[derive(Error, Debug)]
pub enum DataError {
    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backing store rejected or failed the operation
    #[error("Repository error: {0}")]
    Repository(String),

    /// Rows could not be mapped to or from domain types
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The repository does not implement the requested capability
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// One or more items of a parallel update failed
    #[error("{0}")]
    BatchUpdate(BatchUpdateFailure),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataError {
    /// Shorthand for repository failures built from any displayable cause.
    pub fn repository(cause: impl std::fmt::Display) -> Self {
        DataError::Repository(cause.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for DataError {
    fn into_response(self) -> Response {
        let status = match &self {
            DataError::NotFound(_) => StatusCode::NOT_FOUND,
            DataError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DataError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            DataError::Repository(_) | DataError::BatchUpdate(_) => StatusCode::BAD_GATEWAY,
            DataError::Serialization(_) | DataError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the data layer.
pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = DataError::NotFound("event:1".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = DataError::InvalidRequest("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = DataError::repository("connection reset").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_repository_helper_keeps_message() {
        let err = DataError::repository("timeout after 30s");
        assert_eq!(err.to_string(), "Repository error: timeout after 30s");
    }
}
