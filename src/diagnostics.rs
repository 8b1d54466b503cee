use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;
use tracing::trace;

/// Append-only troubleshooting file, separate from the logs being served.
/// Every write is best effort; failures never reach the caller.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn record(&self, message: &str) {
        let Some(path) = &self.path else { return };
        let line = format!(
            "{}: {message}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let written = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            trace!("diagnostic write to {} skipped: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn appends_timestamped_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mcp_debug.log");
        let diag = DiagnosticLog::new(Some(path.clone()));

        diag.record("first").await;
        diag.record("second").await;

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Z: first"));
        assert!(lines[1].ends_with(": second"));
    }

    #[tokio::test]
    async fn unwritable_target_is_ignored() {
        let dir = tempdir().unwrap();
        // a directory cannot be opened for append
        let diag = DiagnosticLog::new(Some(dir.path().to_path_buf()));
        diag.record("lost").await;
        DiagnosticLog::disabled().record("nowhere").await;
    }
}
