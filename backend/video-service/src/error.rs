use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Business status codes carried in every error body.
pub mod codes {
    pub const SUCCESS: i32 = 10000;
    pub const PARAM: i32 = 20000;
    pub const AUTH: i32 = 30000;
    pub const NOT_FOUND: i32 = 40400;
    pub const INTERNAL: i32 = 50000;
    pub const DATABASE: i32 = 50001;
    pub const CACHE: i32 = 50002;
    pub const QUEUE: i32 = 50004;
    pub const ID_GENERATOR: i32 = 50005;
    pub const STORAGE: i32 = 50006;
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("Id generation error: {0}")]
    IdGeneration(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::DatabaseError(_) => codes::DATABASE,
            AppError::CacheError(_) => codes::CACHE,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::ValidationError(_) => codes::PARAM,
            AppError::Unauthorized(_) => codes::AUTH,
            AppError::StorageError(_) => codes::STORAGE,
            AppError::QueueError(_) => codes::QUEUE,
            AppError::IdGeneration(_) => codes::ID_GENERATOR,
            AppError::InternalError(_) => codes::INTERNAL,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: i32,
    pub status: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Internal details stay in the logs.
        let message = match self {
            AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::Unauthorized(msg) => msg.clone(),
            _ => {
                tracing::error!(error = %self, code = self.code(), "Request failed");
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: message,
            code: self.code(),
            status: status.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::StorageError(_) | AppError::QueueError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => AppError::NotFound(format!("video {} not found", id)),
            RepositoryError::Database(e) => AppError::DatabaseError(e.to_string()),
            RepositoryError::Corrupt(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<video_cache::CacheError> for AppError {
    fn from(err: video_cache::CacheError) -> Self {
        AppError::CacheError(err.to_string())
    }
}

impl From<snowflake_id::SnowflakeError> for AppError {
    fn from(err: snowflake_id::SnowflakeError) -> Self {
        AppError::IdGeneration(err.to_string())
    }
}

impl From<video_core::PaginationError> for AppError {
    fn from(err: video_core::PaginationError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
