//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Validators, the entity-found check, the auth extractor and the DAOs all raise
//! `AppError`; controllers never catch it themselves.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so the single
//! `process_error` mapping below turns any failure into the status code and the
//! `{ errorCode, error, message, details }` body every endpoint shares.
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `ValidationFailure` and `jsonwebtoken::errors::Error` keep the `?` operator usable.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use validator::ValidationErrors;

use crate::pipeline::{Constraint, ValidationFailure};

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid JWT (HTTP 401). Checked before any business logic.
    Unauthorized(String),
    /// Malformed request that never reached validation (HTTP 400).
    BadRequest(String),
    /// A by-id lookup or mutation touched no entity (HTTP 404).
    NotFound { resource: String, id: i64 },
    /// Unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Error raised by the persistence layer (HTTP 500).
    DatabaseError(String),
    /// Schema or content validation failed (HTTP 422 Unprocessable Entity).
    ValidationError(ValidationFailure),
}

/// Normalized error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: u16,
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    /// Machine-readable kind of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound { .. } => "not_found",
            AppError::InternalServerError(_) => "internal",
            AppError::DatabaseError(_) => "database",
            AppError::ValidationError(_) => "validation",
        }
    }

    /// Converts any failure into the shared error body.
    pub fn process_error(&self) -> ErrorBody {
        let details = match self {
            AppError::NotFound { resource, id } => Some(json!({ "resource": resource, "id": id })),
            AppError::ValidationError(failure) => serde_json::to_value(&failure.details).ok(),
            _ => None,
        };
        let message = match self {
            // Database errors are presented as generic internal errors to the client.
            AppError::DatabaseError(_) => "Internal server error".to_string(),
            AppError::ValidationError(failure) => failure.to_string(),
            AppError::NotFound { resource, id } => format!("{} with id {} not found", resource, id),
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
        };
        ErrorBody {
            error_code: self.status_code().as_u16(),
            error: self.kind().to_string(),
            message,
            details,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound { resource, id } => write!(f, "Not Found: {} {}", resource, id),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(failure) => write!(f, "Validation Error: {}", failure),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(self.process_error())
    }
}

/// A write naming a parent row that does not exist, reported on the
/// referencing column. Postgres names the constraint `<table>_<column>_fkey`.
fn foreign_key_violation(code: Option<&str>, constraint: Option<&str>) -> Option<AppError> {
    if code != Some(FOREIGN_KEY_VIOLATION) {
        return None;
    }
    let field = constraint
        .and_then(|name| name.strip_suffix("_fkey"))
        .and_then(|name| name.split_once('_'))
        .map_or("reference", |(_, column)| column);
    Some(AppError::ValidationError(ValidationFailure::single(
        field,
        Constraint::Valid,
        format!("\"{}\" references a missing row", field),
    )))
}

/// Converts `sqlx::Error` into `AppError::DatabaseError`, except foreign-key
/// violations, which become validation errors.
///
/// Lookups use `fetch_optional`, so a missing row is reported by the
/// entity-found check with the resource name and id instead.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(db) = &error {
            if let Some(mapped) = foreign_key_violation(db.code().as_deref(), db.constraint()) {
                return mapped;
            }
        }
        AppError::DatabaseError(error.to_string())
    }
}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> AppError {
        AppError::ValidationError(failure)
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The per-field messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.into())
    }
}

/// Converts `jsonwebtoken::errors::Error` into `AppError::Unauthorized`.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}
