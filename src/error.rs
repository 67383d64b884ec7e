//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror. Errors
//! raised inside the upload middleware are rendered through [`IntoResponse`]
//! instead of escaping the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    UploadNotFound(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UploadNotFound(_) | Error::Upload(_) => StatusCode::BAD_REQUEST,
            Error::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::EnvVar(_)
            | Error::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Upload request failed: {}", self);
        } else {
            tracing::warn!("Upload request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_not_found_message_is_verbatim() {
        let err = Error::UploadNotFound("Uploaded file not found.".to_string());
        assert_eq!(err.to_string(), "Uploaded file not found.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_misconfiguration_is_server_error() {
        let err = Error::Config("upload service is not configured".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_image_error_maps_to_unprocessable() {
        let err = Error::Image(image::ImageError::IoError(std::io::Error::other("bad")));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
