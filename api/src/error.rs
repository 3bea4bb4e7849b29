/// HTTP error mapping for API handlers.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vidharbor_shared::errors::VidharborError;

/// Error response body.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler error rendered as `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<VidharborError> for ApiError {
    fn from(err: VidharborError) -> Self {
        let status = match &err {
            VidharborError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            VidharborError::NotFound(_) => StatusCode::NOT_FOUND,
            VidharborError::ExtractionFailed { .. }
            | VidharborError::DownloadFailed { .. }
            | VidharborError::Io(_)
            | VidharborError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
