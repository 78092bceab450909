use crate::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Message returned for every failed upload, whatever went wrong underneath.
pub const UPLOAD_FAILED_MESSAGE: &str = "Error uploading file to S3";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Endpoint was called with a verb other than the one it serves
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// The request body could not be read as multipart/form-data
    #[error("Failed to parse multipart data: {message}")]
    Multipart { message: String },

    /// The multipart body carried no usable `file` field
    #[error("No file provided in field '{field}'")]
    MissingFile { field: &'static str },

    /// Object storage rejected or never received the upload
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration is inconsistent or incomplete
    #[error("{message}")]
    InvalidConfig { message: String },
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            // Parse and storage failures share one status and message
            Error::Multipart { .. } | Error::MissingFile { .. } | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::MethodNotAllowed => "Method Not Allowed".to_string(),
            Error::Multipart { .. } | Error::MissingFile { .. } | Error::Storage(_) => UPLOAD_FAILED_MESSAGE.to_string(),
            Error::InvalidConfig { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Storage(_) | Error::InvalidConfig { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Multipart { .. } | Error::MissingFile { .. } => {
                tracing::warn!("Rejected upload: {}", self);
            }
            Error::MethodNotAllowed => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorResponse {
            message: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failures_share_status_and_message() {
        let errors = [
            Error::Multipart {
                message: "unexpected end of stream".to_string(),
            },
            Error::MissingFile { field: "file" },
            Error::Storage(StorageError::Credentials {
                message: "InvalidAccessKeyId".to_string(),
            }),
        ];

        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.user_message(), UPLOAD_FAILED_MESSAGE);
        }
    }

    #[test]
    fn test_user_message_hides_storage_detail() {
        let err = Error::Storage(StorageError::Unreachable {
            message: "dns error: failed to lookup s3.internal.example".to_string(),
        });

        assert!(err.to_string().contains("s3.internal.example"));
        assert!(!err.user_message().contains("s3.internal.example"));
    }

    #[test]
    fn test_method_not_allowed_status() {
        assert_eq!(Error::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_invalid_config_is_internal_error() {
        let err = Error::InvalidConfig {
            message: "storage.bucket must not be empty".to_string(),
        };

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");
    }
}
