//! File serving helpers
//!
//! Streams stored images and videos back with a guessed content type.

use std::path::Path;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};

use crate::error::{AppError, Result};

/// Serve a file from local storage, 404 when it does not exist
pub async fn serve_file(path: &Path, kind: &str) -> Result<Response> {
    tracing::debug!(path = %path.display(), "Fetching file");

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(kind.to_string()));
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename.replace('"', "")),
        )
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_serve_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpg");
        tokio::fs::write(&path, b"jpeg bytes").await.unwrap();

        let response = serve_file(&path, "Image").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
    }

    #[tokio::test]
    async fn test_serve_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = serve_file(&temp_dir.path().join("nope.mp4"), "Video")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERR014");
    }
}
