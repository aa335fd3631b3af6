//! Content Hash Index
//!
//! Duplicate detection for uploaded files:
//! - One `hashes.json` per user directory, content hash -> stored file name
//! - Hash is SHA-256 over the base64 encoding of the file content
//! - Whole-file rewrite on every mutation, staged through a temp file
//! - Per-directory locking around read-modify-write

pub mod store;
pub mod types;

pub use store::{compute_hash, hash_base64, index_path, HashIndexStore};
pub use types::*;
