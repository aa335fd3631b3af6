//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::hash_index::HashIndexStore;
use crate::media::{
    CompressionSettings, ContentClassifier, FfmpegTranscoder, ScriptClassifier, VideoTranscoder,
};
use crate::storage::MediaStorage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    storage: MediaStorage,
    hash_index: HashIndexStore,
    classifier: Arc<dyn ContentClassifier>,
    transcoder: Arc<dyn VideoTranscoder>,
}

impl AppState {
    /// Create application state with the external tools named in `config`
    pub fn new(config: Config) -> Self {
        let classifier = Arc::new(ScriptClassifier::new(
            config.tools.python_bin.clone(),
            config.tools.nsfw_script.clone(),
            config.tools.nsfw_timeout(),
        ));
        let transcoder = Arc::new(FfmpegTranscoder::new(
            config.tools.ffmpeg_bin.clone(),
            config.tools.transcode_timeout(),
        ));

        Self::with_tools(config, classifier, transcoder)
    }

    /// Create application state with explicit tool implementations
    pub fn with_tools(
        config: Config,
        classifier: Arc<dyn ContentClassifier>,
        transcoder: Arc<dyn VideoTranscoder>,
    ) -> Self {
        let storage = MediaStorage::new(&config.storage, &config.server);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                hash_index: HashIndexStore::new(),
                classifier,
                transcoder,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.inner.storage
    }

    pub fn hash_index(&self) -> &HashIndexStore {
        &self.inner.hash_index
    }

    pub fn classifier(&self) -> &dyn ContentClassifier {
        self.inner.classifier.as_ref()
    }

    pub fn transcoder(&self) -> &dyn VideoTranscoder {
        self.inner.transcoder.as_ref()
    }

    /// Image resize/encode parameters from the configuration
    pub fn compression_settings(&self) -> CompressionSettings {
        CompressionSettings {
            target_width: self.inner.config.media.image_target_width,
            jpeg_quality: self.inner.config.media.image_jpeg_quality,
        }
    }
}
