//! Media processing types

use std::time::Duration;

/// Supported source formats for image compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::WebP => "webp",
        }
    }
}

/// Resize/re-encode parameters
#[derive(Debug, Clone, Copy)]
pub struct CompressionSettings {
    /// Output width in pixels, height follows the aspect ratio
    pub target_width: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            target_width: 500,
            jpeg_quality: 85,
        }
    }
}

/// Media processing error types
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("{tool} timed out after {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Task(String),
}
