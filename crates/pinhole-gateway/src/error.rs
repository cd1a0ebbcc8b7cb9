use crate::model::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pinhole_core::ShortenerError;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    BadRequestBody,
    /// The stored URL cannot be sent as a `Location` header.
    BadLocation,
    Service(ShortenerError),
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        Self::Service(value)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequestBody => StatusCode::BAD_REQUEST,
            AppError::Service(ShortenerError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Service(ShortenerError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::BadLocation | AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequestBody => "Invalid request body".to_string(),
            AppError::Service(err @ ShortenerError::InvalidInput(_)) => err.to_string(),
            AppError::Service(ShortenerError::NotFound(_)) => "Short URL not found".to_string(),
            AppError::BadLocation => {
                error!("stored url is not a valid location header");
                "Internal server error".to_string()
            }
            AppError::Service(err) => {
                error!(error = %err, "request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
