//! Configuration management for the media server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public prefix for generated links, always ending in `/`
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub images_dir: PathBuf,
    pub videos_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub max_images_per_user: usize,
    pub max_upload_bytes: usize,
    pub image_target_width: u32,
    pub image_jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    pub python_bin: String,
    pub nsfw_script: PathBuf,
    pub nsfw_timeout_secs: u64,
    pub ffmpeg_bin: String,
    pub transcode_timeout_secs: u64,
}

impl ToolsConfig {
    pub fn nsfw_timeout(&self) -> Duration {
        Duration::from_secs(self.nsfw_timeout_secs)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 7000,
                base_url: "http://localhost:7000/".to_string(),
            },
            storage: StorageConfig {
                images_dir: PathBuf::from("public/images"),
                videos_dir: PathBuf::from("public/videos"),
            },
            media: MediaConfig {
                max_images_per_user: 6,
                max_upload_bytes: 50 * 1024 * 1024,
                image_target_width: 500,
                image_jpeg_quality: 85,
            },
            tools: ToolsConfig {
                python_bin: "python".to_string(),
                nsfw_script: PathBuf::from("utils/nsfw_detector.py"),
                nsfw_timeout_secs: 60,
                ffmpeg_bin: "ffmpeg".to_string(),
                transcode_timeout_secs: 600,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                base_url: normalize_base_url(
                    env::var("SERVER_BASE_URL").unwrap_or(defaults.server.base_url),
                ),
            },
            storage: StorageConfig {
                images_dir: env::var("IMAGES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.images_dir),
                videos_dir: env::var("VIDEOS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.videos_dir),
            },
            media: MediaConfig {
                max_images_per_user: parse_var(
                    "MAX_IMAGES_PER_USER",
                    defaults.media.max_images_per_user,
                )?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.media.max_upload_bytes)?,
                image_target_width: parse_var(
                    "IMAGE_TARGET_WIDTH",
                    defaults.media.image_target_width,
                )?,
                image_jpeg_quality: parse_var(
                    "IMAGE_JPEG_QUALITY",
                    defaults.media.image_jpeg_quality,
                )?,
            },
            tools: ToolsConfig {
                python_bin: env::var("PYTHON_BIN").unwrap_or(defaults.tools.python_bin),
                nsfw_script: env::var("NSFW_DETECTOR_SCRIPT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tools.nsfw_script),
                nsfw_timeout_secs: parse_var("NSFW_TIMEOUT_SECS", defaults.tools.nsfw_timeout_secs)?,
                ffmpeg_bin: env::var("FFMPEG_BIN").unwrap_or(defaults.tools.ffmpeg_bin),
                transcode_timeout_secs: parse_var(
                    "TRANSCODE_TIMEOUT_SECS",
                    defaults.tools.transcode_timeout_secs,
                )?,
            },
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn normalize_base_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:7000".to_string()),
            "http://localhost:7000/"
        );
        assert_eq!(
            normalize_base_url("https://cdn.example.com/media/".to_string()),
            "https://cdn.example.com/media/"
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.media.max_images_per_user, 6);
        assert_eq!(config.media.image_target_width, 500);
        assert_eq!(config.media.image_jpeg_quality, 85);
        assert_eq!(config.tools.nsfw_timeout(), Duration::from_secs(60));
    }
}
