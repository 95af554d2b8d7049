use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::geo::LookupError;
use crate::validation::ValidationError;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Validation(ValidationError),
    Lookup(LookupError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "INVALID_ADDRESS", e.to_string())
            }
            AppError::Lookup(LookupError::RateLimited) => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                LookupError::RateLimited.to_string(),
            ),
            AppError::Lookup(e) => (StatusCode::BAD_GATEWAY, "LOOKUP_FAILED", e.to_string()),
        };

        let body = json!({
            "error": message,
            "code": code,
            "timestamp": Utc::now().to_rfc3339()
        });

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e)
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        AppError::Lookup(e)
    }
}
