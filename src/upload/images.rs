//! Image upload flows
//!
//! Every incoming image is staged under a temporary name, screened by the
//! content classifier, compressed to JPEG under its final name, and only then
//! recorded in the user's hash index.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::hash_index::{compute_hash, strip_extension};
use crate::media::{compress_file_to, compressed_path};
use crate::state::AppState;
use crate::storage::{is_media_file, staging_path, validate_segment};

/// Reject empty user ids before touching the filesystem
pub fn require_user_id(user_id: &str) -> Result<&str> {
    if user_id.trim().is_empty() {
        return Err(AppError::EmptyUserId);
    }
    Ok(user_id)
}

/// Current image count for a user, failing once the limit is reached
pub async fn ensure_capacity(state: &AppState, user_id: &str) -> Result<usize> {
    let count = state
        .storage()
        .count_images(user_id)
        .await
        .map_err(AppError::counting_images)?;

    if count >= state.config().media.max_images_per_user {
        tracing::info!(user_id = %user_id, count, "User has reached the maximum number of images");
        return Err(AppError::MaxImagesReached);
    }
    Ok(count)
}

/// Store a new image for a user, returning its public link
///
/// Fails with `AlreadyExists` when the user already has an image with the
/// same content.
pub async fn store_new_image(
    state: &AppState,
    user_id: &str,
    name: &str,
    data: &[u8],
) -> Result<String> {
    let user_dir = state
        .storage()
        .user_dir(user_id)
        .await
        .map_err(AppError::user_directory)?;
    let name = media_name(name)?;

    let hash = compute_hash(data);
    tracing::debug!(user_id = %user_id, hash = %hash, bytes = data.len(), "Processing image");

    if state
        .hash_index()
        .exists(&user_dir, &hash)
        .await
        .map_err(AppError::HashIndex)?
    {
        return Err(AppError::AlreadyExists);
    }

    let id = Uuid::new_v4().to_string();
    let stored_name = file_name_of(&compressed_path(Path::new(&format!("{}_{}", id, name))));
    let staged = staging_path(&user_dir, &id);
    let target = user_dir.join(&stored_name);

    tokio::fs::write(&staged, data)
        .await
        .map_err(AppError::WritingFile)?;
    screen_and_compress(state, &staged, &target).await?;

    let inserted = state
        .hash_index()
        .add_if_absent(&user_dir, &hash, &stored_name)
        .await;
    match inserted {
        Ok(true) => {}
        Ok(false) => {
            // Identical content finished first in a concurrent request
            discard(&target).await;
            return Err(AppError::AlreadyExists);
        }
        Err(e) => {
            discard(&target).await;
            return Err(AppError::HashIndex(e));
        }
    }

    let link = state.storage().image_url(user_id, &stored_name);
    tracing::info!(user_id = %user_id, hash = %hash, link = %link, "Image stored");
    Ok(link)
}

/// Replace the content of a named image, returning its public link
///
/// The stored name keeps the requested stem with a `.jpg` extension.
pub async fn replace_image(
    state: &AppState,
    user_id: &str,
    name: &str,
    data: &[u8],
) -> Result<String> {
    let user_dir = state
        .storage()
        .user_dir(user_id)
        .await
        .map_err(AppError::user_directory)?;
    let name = media_name(name)?;

    let hash = compute_hash(data);
    let requested = user_dir.join(name);
    let target = compressed_path(&requested);
    let stored_name = file_name_of(&target);

    // A new name adds an image
    if !path_exists(&requested).await && !path_exists(&target).await {
        ensure_capacity(state, user_id).await?;
    }

    // The content may only already be recorded for the image being replaced
    let recorded = state
        .hash_index()
        .load(&user_dir)
        .await
        .map_err(AppError::HashIndex)?
        .and_then(|index| index.get(&hash).map(|entry| entry.path.clone()));
    if let Some(path) = recorded {
        if path != name && path != stored_name {
            tracing::info!(user_id = %user_id, hash = %hash, existing = %path, "Update duplicates another image");
            return Err(AppError::AlreadyExists);
        }
    }

    let staged = staging_path(&user_dir, &Uuid::new_v4().to_string());

    tokio::fs::write(&staged, data)
        .await
        .map_err(AppError::WritingFile)?;
    screen_and_compress(state, &staged, &target).await?;

    if requested != target && path_exists(&requested).await {
        tokio::fs::remove_file(&requested)
            .await
            .map_err(AppError::RemovingOriginal)?;
    }

    release_hash(state, &user_dir, name).await?;
    state
        .hash_index()
        .add(&user_dir, &hash, &stored_name)
        .await
        .map_err(AppError::HashIndex)?;

    let link = state.storage().image_url(user_id, &stored_name);
    tracing::info!(user_id = %user_id, hash = %hash, link = %link, "Image replaced");
    Ok(link)
}

/// Delete a named image and its hash index entry
pub async fn delete_image(state: &AppState, user_id: &str, name: &str) -> Result<()> {
    let user_dir = state
        .storage()
        .user_dir_path(user_id)
        .map_err(AppError::user_directory)?;
    let name = validate_segment(name).map_err(|_| AppError::InvalidName(name.to_string()))?;
    if !is_media_file(name) {
        return Err(AppError::NotFound("Image".to_string()));
    }
    let path = user_dir.join(name);

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("Image".to_string()));
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "failed to delete {}: {}",
                path.display(),
                e
            )))
        }
    }

    release_hash(state, &user_dir, name).await?;
    tracing::info!(user_id = %user_id, name = %name, "Image deleted");
    Ok(())
}

/// Resolve the on-disk path of a named image
pub fn image_path(state: &AppState, user_id: &str, name: &str) -> Result<PathBuf> {
    let user_dir = state
        .storage()
        .user_dir_path(user_id)
        .map_err(AppError::user_directory)?;
    let name = validate_segment(name).map_err(|_| AppError::InvalidName(name.to_string()))?;
    if !is_media_file(name) {
        return Err(AppError::NotFound("Image".to_string()));
    }
    Ok(user_dir.join(name))
}

// ============================================================================
// Helpers
// ============================================================================

/// Classify the staged upload, then compress it into `target`
///
/// The staged file is always gone when this returns.
async fn screen_and_compress(state: &AppState, staged: &Path, target: &Path) -> Result<()> {
    let flagged = match state.classifier().is_flagged(staged).await {
        Ok(flagged) => flagged,
        Err(e) => {
            discard(staged).await;
            return Err(AppError::ContentCheck(e));
        }
    };

    if flagged {
        tracing::warn!(path = %staged.display(), "Image flagged by content check, removed");
        discard(staged).await;
        return Err(AppError::ContentFlagged);
    }

    if let Err(e) = compress_file_to(staged, target, state.compression_settings()).await {
        discard(staged).await;
        return Err(AppError::Compression(e));
    }

    tokio::fs::remove_file(staged)
        .await
        .map_err(AppError::RemovingOriginal)
}

/// Drop the index entry for `name`, falling back to a base-name match
///
/// Stored names may carry a different extension than the one a client asks
/// for. An index without any matching entry is tolerated.
async fn release_hash(state: &AppState, user_dir: &Path, name: &str) -> Result<()> {
    let index = state.hash_index();

    match index.remove_by_path(user_dir, name).await {
        Ok(()) => return Ok(()),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(AppError::RemovingHash(e)),
    }

    let base_name = strip_extension(name);
    tracing::debug!(name = %name, base_name = %base_name, "Matching hash by base name");

    match index.remove_by_base_name(user_dir, base_name).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            tracing::warn!(dir = %user_dir.display(), name = %name, "No hash entry for file");
            Ok(())
        }
        Err(e) => Err(AppError::RemovingHash(e)),
    }
}

/// Validate a name a client wants to store an image under
fn media_name(name: &str) -> Result<&str> {
    match validate_segment(name) {
        Ok(name) if is_media_file(name) => Ok(name),
        _ => Err(AppError::InvalidName(name.to_string())),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove file: {}", e);
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
