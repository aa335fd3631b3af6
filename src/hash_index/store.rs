//! Hash Index Store
//!
//! Loads, mutates and persists `hashes.json` files. Each mutation runs the
//! full load -> mutate -> persist cycle while holding a lock dedicated to the
//! target directory, so concurrent requests against one user directory are
//! serialized while different directories proceed independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::types::{HashEntry, HashIndex, HashIndexError, INDEX_FILE_NAME, INDEX_TEMP_FILE_NAME};

type Result<T> = std::result::Result<T, HashIndexError>;

// ============================================================================
// Hashing
// ============================================================================

/// Compute the content hash stored in the index
///
/// The digest is taken over the standard base64 encoding of `content`, not
/// the raw bytes. Existing `hashes.json` files were written this way.
pub fn compute_hash(content: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);
    hash_base64(&encoded)
}

/// SHA-256 of an already base64-encoded payload, as lowercase hex
pub fn hash_base64(encoded: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    hex::encode(hasher.finalize())
}

/// Path of the index file for a directory
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE_NAME)
}

// ============================================================================
// Hash Index Store
// ============================================================================

/// Directory-scoped hash index access with per-directory mutual exclusion
#[derive(Clone, Default)]
pub struct HashIndexStore {
    inner: Arc<HashIndexStoreInner>,
}

#[derive(Default)]
struct HashIndexStoreInner {
    /// One async lock per directory with a mutation in flight
    locks: parking_lot::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Exclusive access to one directory's index
///
/// The registry entry is dropped with the last holder, so the registry only
/// tracks directories that are being mutated right now.
struct DirectoryLock<'a> {
    store: &'a HashIndexStore,
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DirectoryLock<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.store.inner.locks.lock();
        // Registry + this handle; clones are only made under the registry lock
        if Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.dir)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock))
        {
            locks.remove(&self.dir);
        }
    }
}

/// Which entry a removal targets
enum EntryMatch<'a> {
    Path(&'a str),
    BaseName(&'a str),
}

impl<'a> EntryMatch<'a> {
    fn find<'i>(&self, index: &'i HashIndex) -> Option<&'i HashEntry> {
        match self {
            EntryMatch::Path(path) => index.find_by_path(path),
            EntryMatch::BaseName(base_name) => index.find_by_base_name(base_name),
        }
    }

    fn target(&self) -> &'a str {
        match self {
            EntryMatch::Path(target) | EntryMatch::BaseName(target) => target,
        }
    }
}

impl HashIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_directory(&self, dir: &Path) -> DirectoryLock<'_> {
        let lock = {
            let mut locks = self.inner.locks.lock();
            locks.entry(dir.to_path_buf()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;

        DirectoryLock {
            store: self,
            dir: dir.to_path_buf(),
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_directories(&self) -> usize {
        self.inner.locks.lock().len()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load the index for `dir`, or `None` when it has never been written
    pub async fn load(&self, dir: &Path) -> Result<Option<HashIndex>> {
        read_index(dir).await
    }

    /// Check whether `hash` is recorded for `dir`
    pub async fn exists(&self, dir: &Path, hash: &str) -> Result<bool> {
        let exists = match read_index(dir).await? {
            Some(index) => index.contains(hash),
            None => false,
        };

        tracing::debug!(dir = %dir.display(), hash = %hash, exists, "Hash lookup");
        Ok(exists)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert or overwrite the entry for `hash`
    pub async fn add(&self, dir: &Path, hash: &str, path: &str) -> Result<()> {
        let _lock = self.lock_directory(dir).await;

        let mut index = read_index(dir).await?.unwrap_or_default();
        index.insert(hash, path);
        write_index(dir, &index).await?;

        tracing::info!(
            dir = %dir.display(),
            hash = %hash,
            path = %path,
            entries = index.len(),
            "Added hash"
        );
        Ok(())
    }

    /// Insert the entry only when `hash` is not yet recorded
    ///
    /// Returns `false`, leaving the index untouched, when the hash exists.
    pub async fn add_if_absent(&self, dir: &Path, hash: &str, path: &str) -> Result<bool> {
        let _lock = self.lock_directory(dir).await;

        let mut index = read_index(dir).await?.unwrap_or_default();
        if index.contains(hash) {
            tracing::debug!(dir = %dir.display(), hash = %hash, "Hash already recorded");
            return Ok(false);
        }

        index.insert(hash, path);
        write_index(dir, &index).await?;

        tracing::info!(
            dir = %dir.display(),
            hash = %hash,
            path = %path,
            entries = index.len(),
            "Added hash"
        );
        Ok(true)
    }

    /// Remove the entry whose stored path equals `path`
    ///
    /// A directory without an index is treated as having nothing to remove.
    pub async fn remove_by_path(&self, dir: &Path, path: &str) -> Result<()> {
        self.remove_first_match(dir, EntryMatch::Path(path)).await
    }

    /// Remove the entry whose stored path, extension stripped, equals `base_name`
    pub async fn remove_by_base_name(&self, dir: &Path, base_name: &str) -> Result<()> {
        self.remove_first_match(dir, EntryMatch::BaseName(base_name))
            .await
    }

    async fn remove_first_match(&self, dir: &Path, matching: EntryMatch<'_>) -> Result<()> {
        let _lock = self.lock_directory(dir).await;
        let target = matching.target();

        let Some(mut index) = read_index(dir).await? else {
            tracing::debug!(dir = %dir.display(), target = %target, "No hash index, nothing to remove");
            return Ok(());
        };

        let hash = matching
            .find(&index)
            .map(|entry| entry.hash.clone())
            .ok_or_else(|| HashIndexError::NotFound(target.to_string()))?;

        index.remove(&hash);
        write_index(dir, &index).await?;

        tracing::info!(
            dir = %dir.display(),
            hash = %hash,
            target = %target,
            entries = index.len(),
            "Removed hash"
        );
        Ok(())
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Delete a staged index left behind by an interrupted write
    ///
    /// Returns whether a temp file was removed.
    pub async fn cleanup_stale_temp(&self, dir: &Path) -> Result<bool> {
        let _lock = self.lock_directory(dir).await;

        let temp_path = dir.join(INDEX_TEMP_FILE_NAME);
        match tokio::fs::remove_file(&temp_path).await {
            Ok(()) => {
                tracing::warn!(path = %temp_path.display(), "Removed stale hash index temp file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HashIndexError::io(temp_path, e)),
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

async fn read_index(dir: &Path) -> Result<Option<HashIndex>> {
    let path = index_path(dir);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HashIndexError::io(path, e)),
    };

    HashIndex::from_json(&data)
        .map(Some)
        .map_err(|source| HashIndexError::Corrupt { path, source })
}

/// Stage the serialized index next to the canonical file, then rename it over
async fn write_index(dir: &Path, index: &HashIndex) -> Result<()> {
    let path = index_path(dir);
    let temp_path = dir.join(INDEX_TEMP_FILE_NAME);

    let data = index.to_json().map_err(|e| {
        HashIndexError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;

    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .map_err(|e| HashIndexError::io(&temp_path, e))?;
    file.write_all(&data)
        .await
        .map_err(|e| HashIndexError::io(&temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| HashIndexError::io(&temp_path, e))?;
    drop(file);

    tokio::fs::rename(&temp_path, &path)
        .await
        .map_err(|e| HashIndexError::io(&path, e))
}

// ============================================================================
// Tests
// ============================================================================
