//! Media Processing
//!
//! Collaborators of the upload pipeline:
//! - Image compression (content-sniffed decode, resize, JPEG encode)
//! - Content classifier (external NSFW detector script)
//! - Video transcoder (external ffmpeg)
//!
//! External tools always run under a timeout.

pub mod classifier;
pub mod compress;
pub mod process;
pub mod transcoder;
pub mod types;

pub use classifier::{ContentClassifier, ScriptClassifier};
pub use compress::{compress_bytes, compress_file_to, compressed_path, CompressedImage};
pub use transcoder::{transcoded_path, FfmpegTranscoder, VideoTranscoder};
pub use types::{CompressionSettings, MediaError, SourceFormat};
