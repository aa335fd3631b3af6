//! Storage types

use std::path::PathBuf;

use serde::Serialize;

/// An image listed for a user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub user_id: String,
    pub name: String,
    /// Path relative to the public root, e.g. `images/<user>/<name>`
    pub path: String,
    #[serde(rename = "isNSFW")]
    pub is_nsfw: bool,
}

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Storage I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
