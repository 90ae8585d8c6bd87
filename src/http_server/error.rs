//! The custom error type for HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

/// An error that can be converted into an HTTP response.
pub enum ApiError {
    /// The request was malformed (wrong method, bad JSON, unknown key, ...).
    BadRequest(String),

    /// Something failed while processing an otherwise valid request.
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::InternalServerError(message) => {
                tracing::error!("internal server error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
