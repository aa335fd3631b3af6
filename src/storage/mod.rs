//! Media storage layout
//!
//! Images live in one directory per user under `images_dir`, next to that
//! user's `hashes.json`. Videos share a single flat `videos_dir`.

mod types;

pub use types::{StorageError, StoredImage};

use std::path::{Path, PathBuf};

use crate::config::{ServerConfig, StorageConfig};
use crate::hash_index::{HashIndexStore, INDEX_FILE_NAME, INDEX_TEMP_FILE_NAME};

type Result<T> = std::result::Result<T, StorageError>;

/// Suffix of incoming files that have not been screened and compressed yet
pub const STAGING_SUFFIX: &str = ".upload.tmp";

/// Resolves and provisions on-disk locations for uploaded media
#[derive(Debug, Clone)]
pub struct MediaStorage {
    images_root: PathBuf,
    videos_root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub fn new(storage: &StorageConfig, server: &ServerConfig) -> Self {
        Self {
            images_root: storage.images_dir.clone(),
            videos_root: storage.videos_dir.clone(),
            base_url: server.base_url.clone(),
        }
    }

    pub fn images_root(&self) -> &Path {
        &self.images_root
    }

    // ========================================================================
    // Directories
    // ========================================================================

    /// Directory for a user's images, created when absent
    pub async fn user_dir(&self, user_id: &str) -> Result<PathBuf> {
        let dir = self.user_dir_path(user_id)?;
        if !tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?
        {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StorageError::io(&dir, e))?;
            tracing::info!(user_id = %user_id, dir = %dir.display(), "Created user directory");
        }
        Ok(dir)
    }

    /// Directory for a user's images, without touching the filesystem
    pub fn user_dir_path(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.images_root.join(validate_segment(user_id)?))
    }

    /// Root of all per-user image directories, created when absent
    pub async fn images_dir(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.images_root)
            .await
            .map_err(|e| StorageError::io(&self.images_root, e))?;
        Ok(self.images_root.clone())
    }

    /// Shared video directory, created when absent
    pub async fn videos_dir(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.videos_root)
            .await
            .map_err(|e| StorageError::io(&self.videos_root, e))?;
        Ok(self.videos_root.clone())
    }

    /// Location of a named video
    pub fn video_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.videos_root.join(validate_segment(name)?))
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Number of stored images for a user (0 when the directory is missing)
    pub async fn count_images(&self, user_id: &str) -> Result<usize> {
        Ok(self.image_names(user_id).await?.len())
    }

    /// Stored images for a user, sorted by name
    pub async fn list_images(&self, user_id: &str) -> Result<Vec<StoredImage>> {
        let images = self
            .image_names(user_id)
            .await?
            .into_iter()
            .map(|name| StoredImage {
                user_id: user_id.to_string(),
                path: format!("images/{}/{}", user_id, name),
                name,
                is_nsfw: false,
            })
            .collect();
        Ok(images)
    }

    async fn image_names(&self, user_id: &str) -> Result<Vec<String>> {
        let dir = self.user_dir_path(user_id)?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if is_media_file(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Public link of a stored image
    pub fn image_url(&self, user_id: &str, file_name: &str) -> String {
        format!(
            "{}images/{}/{}",
            self.base_url,
            urlencoding::encode(user_id),
            urlencoding::encode(file_name)
        )
    }

    /// Public link of a stored video
    pub fn video_url(&self, file_name: &str) -> String {
        format!(
            "{}server-video/video/{}",
            self.base_url,
            urlencoding::encode(file_name)
        )
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Remove temp files left behind by interrupted writes
    ///
    /// Covers staged index files and staged uploads in every user directory.
    pub async fn cleanup_stale_files(&self, hash_index: &HashIndexStore) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.images_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io(&self.images_root, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.images_root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }

            let dir = entry.path();
            match hash_index.cleanup_stale_temp(&dir).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(dir = %dir.display(), "Stale index cleanup failed: {}", e),
            }
            removed += remove_staged_uploads(&dir).await?;
        }

        Ok(removed)
    }
}

/// Staging location for an incoming upload
pub fn staging_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}{}", id, STAGING_SUFFIX))
}

async fn remove_staged_uploads(dir: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StorageError::io(dir, e))?;

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io(dir, e))?
    {
        if !entry.file_name().to_string_lossy().ends_with(STAGING_SUFFIX) {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::warn!(path = %path.display(), "Removed stale staged upload");
                removed += 1;
            }
            Err(e) => tracing::warn!(path = %path.display(), "Failed to remove staged upload: {}", e),
        }
    }

    Ok(removed)
}

/// Validate a single path segment taken from a request
pub fn validate_segment(name: &str) -> Result<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Whether a directory entry is a stored image rather than bookkeeping
pub fn is_media_file(name: &str) -> bool {
    name != INDEX_FILE_NAME && name != INDEX_TEMP_FILE_NAME && !name.ends_with(".tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage_in(temp_dir: &TempDir) -> MediaStorage {
        let storage = StorageConfig {
            images_dir: temp_dir.path().join("images"),
            videos_dir: temp_dir.path().join("videos"),
        };
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7000,
            base_url: "http://localhost:7000/".to_string(),
        };
        MediaStorage::new(&storage, &server)
    }

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("user-1").is_ok());
        assert!(validate_segment("cat photo.jpg").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("..").is_err());
        assert!(validate_segment("../etc").is_err());
        assert!(validate_segment("a\\b").is_err());
    }

    #[test]
    fn test_links() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage_in(&temp_dir);

        assert_eq!(
            storage.image_url("u1", "abc_cat photo.jpg"),
            "http://localhost:7000/images/u1/abc_cat%20photo.jpg"
        );
        assert_eq!(
            storage.video_url("20240101120000_clip.mp4"),
            "http://localhost:7000/server-video/video/20240101120000_clip.mp4"
        );
    }

    #[tokio::test]
    async fn test_user_dir_and_listing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage_in(&temp_dir);

        assert_eq!(storage.count_images("u1").await.unwrap(), 0);
        assert!(storage.list_images("u1").await.unwrap().is_empty());

        let dir = storage.user_dir("u1").await.unwrap();
        assert!(dir.is_dir());

        tokio::fs::write(dir.join("b.jpg"), b"b").await.unwrap();
        tokio::fs::write(dir.join("a.jpg"), b"a").await.unwrap();
        tokio::fs::write(dir.join(INDEX_FILE_NAME), b"{}").await.unwrap();
        tokio::fs::write(dir.join(INDEX_TEMP_FILE_NAME), b"{}").await.unwrap();

        assert_eq!(storage.count_images("u1").await.unwrap(), 2);

        let images = storage.list_images("u1").await.unwrap();
        let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.jpg"]);
        assert_eq!(images[0].path, "images/u1/a.jpg");
    }

    #[tokio::test]
    async fn test_cleanup_stale_files() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage_in(&temp_dir);
        let hash_index = HashIndexStore::new();

        assert_eq!(storage.cleanup_stale_files(&hash_index).await.unwrap(), 0);

        let u1 = storage.user_dir("u1").await.unwrap();
        let u2 = storage.user_dir("u2").await.unwrap();
        tokio::fs::write(u1.join(INDEX_TEMP_FILE_NAME), b"{").await.unwrap();
        tokio::fs::write(staging_path(&u2, "abc"), b"raw").await.unwrap();
        tokio::fs::write(u2.join("keep.jpg"), b"jpg").await.unwrap();

        assert_eq!(storage.cleanup_stale_files(&hash_index).await.unwrap(), 2);
        assert!(!u1.join(INDEX_TEMP_FILE_NAME).exists());
        assert!(!staging_path(&u2, "abc").exists());
        assert!(u2.join("keep.jpg").exists());
    }
}
