//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use circuit_domain::log::UnknownCategory;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors an API handler can answer with.
#[derive(Debug)]
pub enum ApiError {
    /// A query parameter could not be understood.
    InvalidQuery(String),
}

impl From<UnknownCategory> for ApiError {
    fn from(err: UnknownCategory) -> Self {
        Self::InvalidQuery(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidQuery(message) => {
                tracing::debug!(%message, "rejected query");
                (StatusCode::BAD_REQUEST, message)
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
