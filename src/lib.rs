//! Media Server Library
//!
//! Image and video upload service with per-user content deduplication.
//! The server binary is in main.rs; integration tests drive `routes::app`.
//!
//! # Modules
//!
//! - `hash_index`: Per-directory `hashes.json` content index
//! - `media`: Image compression and the external classifier/transcoder
//! - `storage`: On-disk layout and public links
//! - `upload`: Request pipelines tying the above together
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod hash_index;
pub mod media;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;
