//! Video Transcoder
//!
//! Re-encodes uploaded videos to H.264/AAC via the ffmpeg CLI.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::process::run_with_timeout;
use super::types::MediaError;

/// Video transcoder trait
#[async_trait]
pub trait VideoTranscoder: Send + Sync {
    /// Transcode `source`, returning the path of the new file
    async fn transcode(&self, source: &Path) -> Result<PathBuf, MediaError>;
}

/// ffmpeg-based transcoder
pub struct FfmpegTranscoder {
    binary: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl VideoTranscoder for FfmpegTranscoder {
    async fn transcode(&self, source: &Path) -> Result<PathBuf, MediaError> {
        let output = transcoded_path(source);

        tracing::info!(
            source = %source.display(),
            output = %output.display(),
            "Transcoding video"
        );

        let mut command = Command::new(&self.binary);
        command
            .arg("-y") // Overwrite output
            .arg("-i")
            .arg(source)
            .args(["-vcodec", "h264", "-acodec", "aac"])
            .arg(&output);

        run_with_timeout("ffmpeg", command, self.timeout).await?;

        tracing::info!(output = %output.display(), "Compressed video created");
        Ok(output)
    }
}

/// `<source>_compressed.mp4`, next to the source
pub fn transcoded_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push("_compressed.mp4");
    PathBuf::from(name)
}
