//! HTTP-facing errors
//!
//! Each variant owns its status code and the fixed `{"error": ...}` body the
//! client sees. Fetch failures and empty results share [`ApiError::NotFound`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid service_id parameter")]
    InvalidServiceId,

    #[error("Missing service_id parameter")]
    MissingServiceId,

    #[error("No data found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidServiceId | ApiError::MissingServiceId => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
