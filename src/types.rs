// Error types shared by the storage adapter and the HTTP layer

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::ErrorResponse;
use crate::storage::StorageError;

/// Errors returned by route handlers.
///
/// Each storage-backed route has its own variant because the routes render
/// failures differently: upload and download answer with plain text, list
/// answers with a JSON object.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// The multipart body itself could not be read (malformed, too large).
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("{0}")]
    List(#[source] StorageError),

    #[error("Download failed: {0}")]
    Download(#[source] StorageError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            AppError::Upload(_) | AppError::List(_) | AppError::Download(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::List(e) => (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response(),
            other => (status, other.to_string()).into_response(),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
