use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::budget::{ByteBudget, SKIPPED_PLACEHOLDER};
use crate::config::{Config, LogSourceConfig, Platform};
use crate::diagnostics::DiagnosticLog;
use crate::error::{LogReaderError, Result};
use crate::model::{LogContents, LogFileRef, Pagination, ReadLogsRequest, ReadLogsResult};
use crate::reader::{filter_lines, split_lines, tail, LogReader};
use crate::scanner::LogScanner;

/// Log retriever: resolves the directory, discovers and pages files, and reads
/// each one under the byte budget. Holds no per-request state.
pub struct LogRetriever {
    config: LogSourceConfig,
    scanner: LogScanner,
    reader: LogReader,
    diagnostics: DiagnosticLog,
}

impl LogRetriever {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parts(
            config.logs.clone(),
            DiagnosticLog::new(config.diagnostics.log_path.clone()),
        )
    }

    pub fn with_parts(config: LogSourceConfig, diagnostics: DiagnosticLog) -> Result<Self> {
        if config.max_bytes_per_file == 0 || config.max_total_bytes == 0 {
            return Err(LogReaderError::ConfigError(
                "byte limits must be greater than zero".into(),
            ));
        }
        Ok(Self {
            scanner: LogScanner::new(&config.file_prefix)?,
            reader: LogReader::new(),
            config,
            diagnostics,
        })
    }

    /// Directory to read from: the request's custom path verbatim, or the
    /// platform default for the configured application.
    pub fn resolve_directory(&self, request: &ReadLogsRequest) -> Result<PathBuf> {
        if let Some(custom) = request.custom_dir() {
            return Ok(PathBuf::from(custom));
        }
        let home = self
            .config
            .home_dir
            .as_deref()
            .ok_or(LogReaderError::HomeDirUnavailable)?;
        let platform = self.config.platform.unwrap_or_else(Platform::current);
        Ok(platform.default_log_dir(home, &self.config.app_name))
    }

    pub async fn read_logs(&self, request: &ReadLogsRequest) -> Result<ReadLogsResult> {
        match self.try_read_logs(request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("reading logs failed: {e}");
                self.diagnostics
                    .record(&format!("Error reading MCP logs: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    async fn try_read_logs(&self, request: &ReadLogsRequest) -> Result<ReadLogsResult> {
        let dir = self.resolve_directory(request)?;
        let dir_display = match request.custom_dir() {
            Some(custom) => custom.to_string(),
            None => dir.to_string_lossy().into_owned(),
        };
        self.diagnostics
            .record(&format!("Looking for MCP logs in: {dir_display}"))
            .await;

        let files = self.scanner.scan(&dir).await?;
        let (pagination, range) =
            Pagination::compute(request.page_number(), request.files_per_page(), files.len());
        debug!(
            "{} log file(s) in {dir_display}, page {} covers {:?}",
            files.len(),
            pagination.current_page,
            range
        );
        if range.is_empty() {
            return Ok(ReadLogsResult::not_found(dir_display));
        }

        let logs = self.read_page(&files[range], request).await;
        info!("read {} log file(s) from {dir_display}", logs.len());
        Ok(ReadLogsResult::read(dir_display, logs, pagination))
    }

    /// Read one page of files in order. Reads are sequential because the
    /// total budget depends on what earlier files consumed.
    pub async fn read_page(&self, files: &[LogFileRef], request: &ReadLogsRequest) -> LogContents {
        let mut budget = ByteBudget::new(self.config.max_bytes_per_file, self.config.max_total_bytes);
        let mut logs = LogContents::new();
        let filter = request.filter_text();
        let count = request.tail_lines();

        for file in files {
            let name = file.file_name();
            if budget.is_exhausted() {
                logs.insert(name, SKIPPED_PLACEHOLDER.to_string());
                continue;
            }
            match self.reader.read_text(&file.path).await {
                Ok(text) => {
                    let lines = filter_lines(split_lines(&text), filter);
                    let content = budget.admit(tail(&lines, count));
                    logs.insert(name, content);
                }
                Err(e) => {
                    debug!("cannot read {}: {e}", file.path.display());
                    let message = format!("Error reading log: {e}");
                    budget.charge(&message);
                    logs.insert(name, message);
                }
            }
        }
        logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::TRUNCATED_MARKER;
    use chrono::Utc;
    use std::path::Path;
    use tempfile::tempdir;

    fn retriever(max_per_file: usize, max_total: usize) -> LogRetriever {
        let cfg = LogSourceConfig {
            home_dir: Some(PathBuf::from("/home/tester")),
            platform: Some(Platform::Other),
            max_bytes_per_file: max_per_file,
            max_total_bytes: max_total,
            ..LogSourceConfig::default()
        };
        LogRetriever::with_parts(cfg, DiagnosticLog::disabled()).unwrap()
    }

    fn file_ref(path: &Path) -> LogFileRef {
        LogFileRef { path: path.to_path_buf(), modified: Utc::now() }
    }

    #[test]
    fn default_directory_uses_platform_layout() {
        let r = retriever(100, 500);
        let dir = r.resolve_directory(&ReadLogsRequest::default()).unwrap();
        assert_eq!(dir, PathBuf::from("/home/tester/.config/Claude/logs"));

        let custom = ReadLogsRequest {
            custom_path: Some("/var/log/custom".into()),
            ..Default::default()
        };
        assert_eq!(r.resolve_directory(&custom).unwrap(), PathBuf::from("/var/log/custom"));
    }

    #[test]
    fn missing_home_is_fatal() {
        let cfg = LogSourceConfig { home_dir: None, ..LogSourceConfig::default() };
        let r = LogRetriever::with_parts(cfg, DiagnosticLog::disabled()).unwrap();
        let err = r.resolve_directory(&ReadLogsRequest::default()).unwrap_err();
        assert!(matches!(err, LogReaderError::HomeDirUnavailable));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let cfg = LogSourceConfig { max_total_bytes: 0, ..LogSourceConfig::default() };
        assert!(LogRetriever::with_parts(cfg, DiagnosticLog::disabled()).is_err());
    }

    #[tokio::test]
    async fn page_applies_per_file_and_total_caps() {
        let dir = tempdir().unwrap();
        let big = dir.path().join("big.log");
        let small = dir.path().join("small.log");
        let late = dir.path().join("late.log");
        std::fs::write(&big, "aaaaaaaaaa\nbbbbbbbbbb\ncccccccccc").unwrap();
        std::fs::write(&small, "tiny").unwrap();
        std::fs::write(&late, "never read").unwrap();

        // the truncated first file alone nearly fills the total
        let r = retriever(15, 50);
        let logs = r
            .read_page(&[file_ref(&big), file_ref(&small), file_ref(&late)], &ReadLogsRequest::default())
            .await;

        assert_eq!(logs.names(), vec!["big.log", "small.log", "late.log"]);
        assert_eq!(logs.get("big.log"), Some(format!("{TRUNCATED_MARKER}cccccccccc").as_str()));
        assert_eq!(logs.get("small.log"), Some("tiny"));
        assert_eq!(logs.get("late.log"), Some(SKIPPED_PLACEHOLDER));
    }

    #[tokio::test]
    async fn unreadable_file_becomes_error_entry() {
        let dir = tempdir().unwrap();
        let ok = dir.path().join("ok.log");
        std::fs::write(&ok, "line").unwrap();
        let gone = dir.path().join("gone.log");

        let r = retriever(1024, 4096);
        let logs = r
            .read_page(&[file_ref(&gone), file_ref(&ok)], &ReadLogsRequest::default())
            .await;
        assert!(logs.get("gone.log").unwrap().starts_with("Error reading log: "));
        assert_eq!(logs.get("ok.log"), Some("line"));
    }
}
