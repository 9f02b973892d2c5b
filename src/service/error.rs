use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ErrorMessage, HttpError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User not found with id: {0}")]
    UserNotFound(Uuid),

    #[error("Ticket not found with id: {0}")]
    TicketNotFound(Uuid),

    #[error("Comment not found with id: {0}")]
    CommentNotFound(Uuid),

    #[error("Username is already taken: {0}")]
    UsernameTaken(String),

    #[error("Email is already in use: {0}")]
    EmailTaken(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Username/email or password is wrong")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn access_denied(message: impl Into<String>) -> Self {
        ServiceError::AccessDenied(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::TicketNotFound(_)
            | ServiceError::CommentNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::UsernameTaken(_) | ServiceError::EmailTaken(_) => StatusCode::CONFLICT,

            ServiceError::AccessDenied(_) => StatusCode::FORBIDDEN,

            ServiceError::InvalidArgument(_)
            | ServiceError::InvalidCredentials => StatusCode::BAD_REQUEST,

            ServiceError::Hashing(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ErrorMessage> for ServiceError {
    fn from(error: ErrorMessage) -> Self {
        match error {
            ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
                ServiceError::InvalidArgument(error.to_string())
            }
            _ => ServiceError::Hashing(error.to_string()),
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Database(ref e) => {
                tracing::error!("database error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
            ServiceError::InvalidCredentials => {
                HttpError::bad_request(ErrorMessage::WrongCredentials.to_string())
            }
            ServiceError::UserNotFound(_)
            | ServiceError::TicketNotFound(_)
            | ServiceError::CommentNotFound(_) => HttpError::not_found(error.to_string()),
            ServiceError::UsernameTaken(_) | ServiceError::EmailTaken(_) => {
                HttpError::conflict(error.to_string())
            }
            ServiceError::AccessDenied(message) => HttpError::forbidden(message),
            _ => HttpError::new(error.to_string(), error.status_code()),
        }
    }
}
