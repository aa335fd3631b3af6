//! Video upload flows
//!
//! Videos are not deduplicated: they share one flat directory and are
//! addressed by file name alone.

use std::path::PathBuf;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::validate_segment;

/// Store an uploaded video under a timestamped name, returning its link
pub async fn store_new_video(state: &AppState, file_name: &str, data: &[u8]) -> Result<String> {
    let file_name =
        validate_segment(file_name).map_err(|_| AppError::InvalidName(file_name.to_string()))?;
    let dir = state.storage().videos_dir().await.map_err(AppError::storage)?;

    let stored_name = timestamped_name(file_name);
    let path = dir.join(&stored_name);
    tokio::fs::write(&path, data)
        .await
        .map_err(AppError::WritingFile)?;

    let link = state.storage().video_url(&stored_name);
    tracing::info!(path = %path.display(), bytes = data.len(), "Video stored");
    Ok(link)
}

/// Overwrite a named video and transcode it, returning the transcoded link
pub async fn replace_video(state: &AppState, name: &str, data: &[u8]) -> Result<String> {
    state.storage().videos_dir().await.map_err(AppError::storage)?;
    let path = state.storage().video_path(name).map_err(AppError::storage)?;

    tokio::fs::write(&path, data)
        .await
        .map_err(AppError::WritingFile)?;

    let output = state
        .transcoder()
        .transcode(&path)
        .await
        .map_err(AppError::Transcode)?;

    let output_name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Internal(format!("transcoder returned {}", output.display())))?;

    let link = state.storage().video_url(&output_name);
    tracing::info!(source = %path.display(), output = %output.display(), "Video replaced");
    Ok(link)
}

/// Delete a named video
pub async fn delete_video(state: &AppState, name: &str) -> Result<()> {
    let path = state.storage().video_path(name).map_err(AppError::storage)?;

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Video deleted");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::NotFound("Video".to_string()))
        }
        Err(e) => Err(AppError::Internal(format!(
            "failed to delete {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Resolve the on-disk path of a named video
pub fn video_path(state: &AppState, name: &str) -> Result<PathBuf> {
    state.storage().video_path(name).map_err(AppError::storage)
}

fn timestamped_name(file_name: &str) -> String {
    format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), file_name)
}
