//! Error types for the media server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::hash_index::HashIndexError;
use crate::media::MediaError;
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request format: {0}")]
    InvalidRequest(String),

    #[error("User ID is required")]
    EmptyUserId,

    #[error("Failed to create or check user directory: {0}")]
    UserDirectory(StorageError),

    #[error("Failed to count user images: {0}")]
    CountingImages(StorageError),

    #[error("Maximum number of images reached for this user")]
    MaxImagesReached,

    #[error("Error decoding base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Error writing file: {0}")]
    WritingFile(std::io::Error),

    #[error("Error checking image content: {0}")]
    ContentCheck(MediaError),

    #[error("Image contains inappropriate content")]
    ContentFlagged,

    #[error("Error compressing image: {0}")]
    Compression(MediaError),

    #[error("Failed to remove original image: {0}")]
    RemovingOriginal(std::io::Error),

    #[error("Hash index error: {0}")]
    HashIndex(HashIndexError),

    #[error("Image already exists")]
    AlreadyExists,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Failed to remove hash: {0}")]
    RemovingHash(HashIndexError),

    #[error("Error compressing video: {0}")]
    Transcode(MediaError),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a user directory failure, keeping invalid names client errors
    pub fn user_directory(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => AppError::InvalidName(name),
            other => AppError::UserDirectory(other),
        }
    }

    /// Map a listing/counting failure, keeping invalid names client errors
    pub fn counting_images(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => AppError::InvalidName(name),
            other => AppError::CountingImages(other),
        }
    }

    /// Map any other storage failure
    pub fn storage(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => AppError::InvalidName(name),
            other => AppError::Internal(other.to_string()),
        }
    }

    /// Stable error code exposed to clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "ERR001",
            AppError::EmptyUserId => "ERR002",
            AppError::UserDirectory(_) => "ERR003",
            AppError::CountingImages(_) => "ERR004",
            AppError::MaxImagesReached => "ERR005",
            AppError::InvalidBase64(_) => "ERR006",
            AppError::WritingFile(_) => "ERR007",
            AppError::ContentCheck(_) => "ERR008",
            AppError::ContentFlagged => "ERR009",
            AppError::Compression(_) => "ERR010",
            AppError::RemovingOriginal(_) => "ERR011",
            AppError::HashIndex(_) => "ERR012",
            AppError::AlreadyExists => "ERR013",
            AppError::NotFound(_) => "ERR014",
            AppError::RemovingHash(_) => "ERR015",
            AppError::Transcode(_) => "ERR016",
            AppError::InvalidName(_) => "ERR017",
            AppError::Internal(_) => "ERR018",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_)
            | AppError::EmptyUserId
            | AppError::MaxImagesReached
            | AppError::InvalidBase64(_)
            | AppError::ContentFlagged
            | AppError::AlreadyExists
            | AppError::InvalidName(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UserDirectory(_)
            | AppError::CountingImages(_)
            | AppError::WritingFile(_)
            | AppError::ContentCheck(_)
            | AppError::Compression(_)
            | AppError::RemovingOriginal(_)
            | AppError::HashIndex(_)
            | AppError::RemovingHash(_)
            | AppError::Transcode(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            AppError::UserDirectory(_) => "Failed to create or check user directory".to_string(),
            AppError::CountingImages(_) => "Failed to count user images".to_string(),
            AppError::WritingFile(_) => "Failed to save uploaded file".to_string(),
            AppError::ContentCheck(_) => "Error checking image for NSFW".to_string(),
            AppError::Compression(_) => "Error compressing image".to_string(),
            AppError::RemovingOriginal(_) => "Failed to remove original image".to_string(),
            AppError::HashIndex(_) => "Failed to update image hashes".to_string(),
            AppError::RemovingHash(_) => "Failed to remove hash".to_string(),
            AppError::Transcode(_) => "Error compressing video".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.public_message(),
            code: err.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::warn!(code = self.code(), "{}", self);
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        assert_eq!(AppError::AlreadyExists.code(), "ERR013");
        assert_eq!(AppError::AlreadyExists.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound("Image".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::WritingFile(std::io::Error::other("disk full at /secret/path"));
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error, "Failed to save uploaded file");
        assert_eq!(body.code, "ERR007");
    }

    #[test]
    fn test_invalid_user_directory_name_is_client_error() {
        let err = AppError::user_directory(StorageError::InvalidName("..".to_string()));
        assert_eq!(err.code(), "ERR017");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
