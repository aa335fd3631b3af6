//! Upload pipeline
//!
//! Orchestrates storage, the hash index and the media tools for each request.

pub mod images;
pub mod videos;

pub use images::{
    delete_image, ensure_capacity, image_path, replace_image, require_user_id, store_new_image,
};
pub use videos::{delete_video, replace_video, store_new_video, video_path};
