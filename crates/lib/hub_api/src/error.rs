//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hub_core::auth::AuthError;
use hub_core::credentials::CredentialError;
use hub_core::tasks::{FieldErrors, TaskError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Field-keyed errors; the map itself is the response body.
    #[error("Invalid fields: {0:?}")]
    InvalidFields(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database unavailable: {0}")]
    DbUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API key required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Request body too large")]
    PayloadTooLarge,

    /// Upstream model call failed; carries the task's generic message.
    #[error("Upstream failure: {0}")]
    Upstream(&'static str),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(&'static str),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::InvalidFields(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
            }
            AppError::Validation(m) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(m.as_str()))
            }
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", Some(m.as_str())),
            AppError::DbUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "db_unavailable",
                Some("The service is temporarily unavailable. Please try again later."),
            ),
            AppError::Unauthorized(m) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", Some(m.as_str()))
            }
            AppError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                "API key required",
                Some("Please provide a valid API key in the X-API-Key header or request body"),
            ),
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "Invalid API key",
                Some("The provided API key is not valid or has been deactivated"),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                Some("Request body too large"),
            ),
            AppError::Upstream(m) => (StatusCode::INTERNAL_SERVER_ERROR, *m, None),
            AppError::ModelUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, *m, None),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                Some("Internal server error"),
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.map(str::to_string),
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::DbUnavailable(e.to_string())
            }
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => {
                AppError::Unauthorized("Invalid username or password.".into())
            }
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::AlreadyExists => {
                AppError::Validation("An API key already exists for this account".into())
            }
            CredentialError::NotFound => {
                AppError::NotFound("No API key exists for this account".into())
            }
            CredentialError::InvalidOrInactive => AppError::InvalidApiKey,
            CredentialError::UnknownAccount(id) => AppError::NotFound(format!("account {id}")),
            CredentialError::Generation => AppError::Internal(e.to_string()),
            CredentialError::Db(e) => AppError::from(e),
        }
    }
}

impl From<TaskError> for AppError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Invalid(errors) => AppError::InvalidFields(errors),
            TaskError::Upstream { message, .. } => AppError::Upstream(message),
            TaskError::ModelUnavailable { message, .. } => AppError::ModelUnavailable(message),
        }
    }
}
