//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the service.
//! Every handled request path terminates either in a value or in one of these variants,
//! so no failure ever has to crash the process.
//!
//! `AppError` implements `actix_web::error::ResponseError` to convert errors into
//! HTTP responses with JSON bodies. `From` conversions exist for `sqlx::Error`,
//! `validator::ValidationErrors` and `bcrypt::BcryptError`, so `?` can be used freely
//! in handlers and stores.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Authentication is missing or failed (HTTP 401).
    /// The message is always generic; the root cause is only logged.
    Unauthorized(String),
    /// Malformed request that could not be parsed (HTTP 400).
    BadRequest(String),
    /// A valid reference to a record that does not exist (HTTP 404).
    NotFound(String),
    /// The write would violate a uniqueness constraint (HTTP 409).
    Conflict(String),
    /// Input parsed but failed validation (HTTP 422 Unprocessable Entity).
    ValidationError(String),
    /// The backing store could not be reached or failed (HTTP 503).
    /// Not retried; the caller maps it to a service-level failure.
    StoreUnavailable(String),
    /// Unexpected server-side failure (HTTP 500).
    InternalServerError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Store Unavailable: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(json!({
                "error": msg
            })),
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
            // Store details stay in the logs.
            AppError::StoreUnavailable(_) => HttpResponse::ServiceUnavailable().json(json!({
                "error": "Service temporarily unavailable"
            })),
            AppError::InternalServerError(_) => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })),
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes `NotFound`, unique-constraint violations become `Conflict`,
/// and everything else is reported as an unavailable store.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
                AppError::Conflict("Record already exists".into())
            }
            _ => {
                log::error!("store failure: {}", error);
                AppError::StoreUnavailable(error.to_string())
            }
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> AppError {
        AppError::StoreUnavailable(format!("Migration failed: {}", error))
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}
