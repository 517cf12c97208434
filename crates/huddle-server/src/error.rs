use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use huddle_protocol::ErrorBody;
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation messages keyed by input field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Activity is full")]
    ActivityFull,

    #[error("Already joined this activity")]
    AlreadyJoined,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("Capacity must be greater than zero")]
    InvalidCapacity,

    #[error("Message body must not be empty")]
    EmptyBody,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::ActivityFull => "activity_full",
            AppError::AlreadyJoined => "already_joined",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation",
            AppError::InvalidCapacity => "invalid_capacity",
            AppError::EmptyBody => "empty_body",
            AppError::Unavailable(_) => "unavailable",
            AppError::Internal(_) | AppError::Database(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ActivityFull | AppError::AlreadyJoined | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::Validation(_) | AppError::InvalidCapacity | AppError::EmptyBody => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store errors worth one more attempt: lock contention, pool exhaustion, I/O.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::PoolTimedOut) | AppError::Database(sqlx::Error::Io(_)) => {
                true
            }
            AppError::Database(sqlx::Error::Database(e)) => e
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                // SQLITE_BUSY and SQLITE_LOCKED, including their extended codes
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Client-facing message; store and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Unavailable(_) => "Service is not ready".to_string(),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Jwt(_) => "Invalid token".to_string(),
            other => other.to_string(),
        }
    }

    fn fields(&self) -> Option<FieldErrors> {
        match self {
            AppError::Validation(fields) => Some(fields.clone()),
            AppError::InvalidCapacity => Some(FieldErrors::from([(
                "capacity".to_string(),
                vec![self.to_string()],
            )])),
            AppError::EmptyBody => Some(FieldErrors::from([(
                "body".to_string(),
                vec![self.to_string()],
            )])),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            code: self.code().to_string(),
            error: self.public_message(),
            fields: self.fields(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
