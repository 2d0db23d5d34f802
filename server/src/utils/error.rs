use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

pub type AppResult<T> = Result<T, AppError>;

/// Entities that can be reported as missing to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Location,
    Category,
    User,
    Event,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Location => "Location",
            Resource::Category => "Category",
            Resource::User => "User",
            Resource::Event => "Event",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Resource::Location => "LOCATION_NOT_FOUND",
            Resource::Category => "CATEGORY_NOT_FOUND",
            Resource::User => "USER_NOT_FOUND",
            Resource::Event => "EVENT_NOT_FOUND",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Field '{0}' is not a valid date")]
    InvalidDate(&'static str),

    #[error("Start date must not be later than end date")]
    InvalidDateRange,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(Resource),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Upload too large: limit is {limit} bytes")]
    UploadTooLarge { limit: u64 },

    #[error("Internal consistency fault: {0}")]
    InternalConsistency(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalConsistency(_) | AppError::Database(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(resource) => resource.code(),
            AppError::UploadRejected(_) | AppError::UploadTooLarge { .. } => "UPLOAD_REJECTED",
            AppError::InternalConsistency(_) | AppError::Database(_) | AppError::Io(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }

    fn log(&self) {
        match self {
            AppError::InternalConsistency(msg) => {
                error!(message = %msg, "Internal consistency fault");
            }
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::Io(e) => {
                error!(error = ?e, "I/O error");
            }
            other => {
                warn!(error = %other, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Server-side faults collapse to one generic message
        let public_message = if self.is_internal() {
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes_are_resource_specific() {
        assert_eq!(AppError::NotFound(Resource::Location).code(), "LOCATION_NOT_FOUND");
        assert_eq!(AppError::NotFound(Resource::Category).code(), "CATEGORY_NOT_FOUND");
        assert_eq!(AppError::NotFound(Resource::Event).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_faults_map_to_server_error() {
        let fault = AppError::InternalConsistency("event 4 has no host".into());
        assert!(fault.is_internal());
        assert_eq!(fault.code(), "INTERNAL_ERROR");

        let io = AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_messages_name_the_field() {
        let err = AppError::from(ValidationError::EmptyField("title"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Validation error: Field 'title' must not be empty");
    }

    #[test]
    fn test_upload_too_large_status() {
        let err = AppError::UploadTooLarge { limit: 1_000_000 };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), "UPLOAD_REJECTED");
    }
}
