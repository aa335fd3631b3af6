//! Bounded execution of external tools

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use super::types::MediaError;

/// Run `command` to completion, killing it once `timeout` elapses
///
/// A non-zero exit status is reported as `ToolFailed` with the tail of the
/// tool's stderr.
pub async fn run_with_timeout(
    tool: &str,
    mut command: Command,
    timeout: Duration,
) -> Result<Output, MediaError> {
    command.kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|e| MediaError::ToolFailed {
            tool: tool.to_string(),
            message: format!("failed to start: {}", e),
        })?,
        Err(_) => {
            tracing::error!(tool = %tool, ?timeout, "External tool timed out");
            return Err(MediaError::ToolTimeout {
                tool: tool.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(tool = %tool, status = %output.status, "External tool failed: {}", stderr);
        return Err(MediaError::ToolFailed {
            tool: tool.to_string(),
            message: format!("{}: {}", output.status, tail(&stderr, 512)),
        });
    }

    Ok(output)
}

fn tail(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    match text.char_indices().rev().nth(max_chars.saturating_sub(1)) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo hello"]);

        let output = run_with_timeout("sh", command, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo broken >&2; exit 3"]);

        let result = run_with_timeout("sh", command, Duration::from_secs(5)).await;
        match result {
            Err(MediaError::ToolFailed { message, .. }) => assert!(message.contains("broken")),
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut command = Command::new("sleep");
        command.arg("5");

        let result = run_with_timeout("sleep", command, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(MediaError::ToolTimeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let command = Command::new("definitely-not-a-real-binary-4242");

        let result = run_with_timeout("missing", command, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(MediaError::ToolFailed { .. })));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("  abcdef  ", 3), "def");
        assert_eq!(tail("abc", 10), "abc");
    }
}
