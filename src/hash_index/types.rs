//! Hash index types

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// File name of the per-directory index
pub const INDEX_FILE_NAME: &str = "hashes.json";

/// File name the index is staged under before being renamed into place
pub const INDEX_TEMP_FILE_NAME: &str = "hashes.json.tmp";

// ============================================================================
// Index Types
// ============================================================================

/// A single index entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEntry {
    /// Content hash (lowercase hex)
    pub hash: String,

    /// Stored file name, relative to the owning directory
    pub path: String,
}

/// Content hash -> stored file mapping for one directory
///
/// Backed by an ordered map: whenever several entries match a path or base
/// name, the one with the smallest hash wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashIndex {
    entries: BTreeMap<String, HashEntry>,
}

impl HashIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an index from its persisted JSON form
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Serialize the full index
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<&HashEntry> {
        self.entries.get(hash)
    }

    /// Insert or overwrite the entry for `hash`, returning the previous one
    pub fn insert(&mut self, hash: &str, path: &str) -> Option<HashEntry> {
        self.entries.insert(
            hash.to_string(),
            HashEntry {
                hash: hash.to_string(),
                path: path.to_string(),
            },
        )
    }

    pub fn remove(&mut self, hash: &str) -> Option<HashEntry> {
        self.entries.remove(hash)
    }

    /// First entry whose path equals `path` exactly
    pub fn find_by_path(&self, path: &str) -> Option<&HashEntry> {
        self.entries.values().find(|entry| entry.path == path)
    }

    /// First entry whose path, extension stripped, equals `base_name`
    pub fn find_by_base_name(&self, base_name: &str) -> Option<&HashEntry> {
        self.entries
            .values()
            .find(|entry| strip_extension(&entry.path) == base_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending hash order
    pub fn iter(&self) -> impl Iterator<Item = &HashEntry> {
        self.entries.values()
    }
}

/// Strip the extension of the final path element
///
/// The extension is everything from the last `.` of the final element, so
/// `photo.tar.gz` becomes `photo.tar` and `photo` is returned unchanged.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Hash index error types
#[derive(Debug, thiserror::Error)]
pub enum HashIndexError {
    #[error("No hash entry found for: {0}")]
    NotFound(String),

    #[error("Hash index {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Hash index I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashIndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
