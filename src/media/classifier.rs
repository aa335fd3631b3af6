//! Content Classifier
//!
//! Screens stored images for inappropriate content. The production
//! implementation shells out to the NSFW detector script and reads its
//! verdict line from the captured output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::process::run_with_timeout;
use super::types::MediaError;

/// Line printed by the detector script when an image is flagged
pub const FLAGGED_MARKER: &str = "NSFW Check Result: True";

/// Content classifier trait
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    /// Whether the image at `path` should be rejected
    async fn is_flagged(&self, path: &Path) -> Result<bool, MediaError>;
}

/// Classifier backed by an external Python script
pub struct ScriptClassifier {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptClassifier {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ContentClassifier for ScriptClassifier {
    async fn is_flagged(&self, path: &Path) -> Result<bool, MediaError> {
        tracing::debug!(path = %path.display(), "Checking image content");

        let mut command = Command::new(&self.interpreter);
        command.arg(&self.script).arg(path);

        let output = run_with_timeout("nsfw-detector", command, self.timeout).await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let flagged = parse_verdict(&text);
        tracing::info!(path = %path.display(), flagged, "Content check complete");
        Ok(flagged)
    }
}

/// Interpret detector output
pub fn parse_verdict(output: &str) -> bool {
    output.contains(FLAGGED_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict() {
        assert!(parse_verdict(
            "NSFW Predictions: [[0.1 0.0 0.1 0.7 0.1]]\nNSFW Check Result: True\n"
        ));
        assert!(!parse_verdict("NSFW Check Result: False\nNSFW Check Result: False\n"));
        assert!(!parse_verdict(""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_classifier_reads_verdict() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let script = temp_dir.path().join("detector.sh");
        tokio::fs::write(&script, "case \"$1\" in *bad*) echo 'NSFW Check Result: True';; *) echo 'NSFW Check Result: False';; esac\n")
            .await
            .unwrap();

        let classifier = ScriptClassifier::new("sh", &script, Duration::from_secs(5));

        assert!(classifier.is_flagged(Path::new("/tmp/bad.jpg")).await.unwrap());
        assert!(!classifier.is_flagged(Path::new("/tmp/good.jpg")).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_failure() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let script = temp_dir.path().join("detector.sh");
        tokio::fs::write(&script, "exit 1\n").await.unwrap();

        let classifier = ScriptClassifier::new("sh", &script, Duration::from_secs(5));

        assert!(matches!(
            classifier.is_flagged(Path::new("/tmp/any.jpg")).await,
            Err(MediaError::ToolFailed { .. })
        ));
    }
}
