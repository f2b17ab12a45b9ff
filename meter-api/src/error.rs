//! Error types for meter-api
//!
//! Maps reading failures to stable HTTP status codes and error codes.
//! Anything outside the domain taxonomy becomes an opaque 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::usecases::ReadingError;

/// Message returned for every non-domain failure
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// One rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body failed validation (400)
    #[error("Invalid request data")]
    InvalidData(Vec<FieldError>),

    /// Unknown measure type filter (400)
    #[error("Invalid measure type: {0}")]
    InvalidType(String),

    /// Use case failure
    #[error(transparent)]
    Reading(#[from] ReadingError),
}

impl ApiError {
    /// Status and stable error code for this failure
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidData(_) => (StatusCode::BAD_REQUEST, "INVALID_DATA"),
            ApiError::InvalidType(_) => (StatusCode::BAD_REQUEST, "INVALID_TYPE"),
            ApiError::Reading(err) => match err {
                ReadingError::ReadingAlreadyExists => (StatusCode::CONFLICT, "DOUBLE_REPORT"),
                ReadingError::ContentGenerationError => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONTENT_GENERATION_ERROR")
                }
                ReadingError::NumberExtractionError => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "NUMBER_EXTRACTION_ERROR")
                }
                ReadingError::ReadingNotFound => (StatusCode::NOT_FOUND, "MEASURE_NOT_FOUND"),
                ReadingError::DuplicateReading => (StatusCode::CONFLICT, "CONFIRMATION_DUPLICATE"),
                ReadingError::ReadingsNotFound => (StatusCode::NOT_FOUND, "MEASURES_NOT_FOUND"),
                ReadingError::Store(_) | ReadingError::Reader(_) | ReadingError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    fn is_opaque(&self) -> bool {
        match self {
            ApiError::Reading(err) => !err.is_domain(),
            _ => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if self.is_opaque() {
            tracing::error!(error = %self, "Request failed");
            let body = Json(json!({
                "error_code": error_code,
                "error_description": UNEXPECTED_ERROR_MESSAGE,
            }));
            return (status, body).into_response();
        }

        let body = match &self {
            ApiError::InvalidData(details) => json!({
                "error_code": error_code,
                "error_description": "The data provided in the request body is invalid",
                "details": details,
            }),
            ApiError::InvalidType(_) => json!({
                "error_code": error_code,
                "error_description": "Measure type not allowed",
            }),
            other => json!({
                "error_code": error_code,
                "error_description": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
