use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use globset::{Glob, GlobMatcher};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{LogReaderError, Result};
use crate::model::LogFileRef;

/// Which scan produced the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Glob scan succeeded.
    Primary(Vec<PathBuf>),
    /// Glob scan failed; the list comes from a plain directory listing.
    Fallback(Vec<PathBuf>),
}

impl Discovery {
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            Discovery::Primary(p) | Discovery::Fallback(p) => p,
        }
    }
}

/// Log file scanner: prefers `<prefix>*.log`, otherwise any `*.log`.
/// Dotfiles are never candidates.
#[derive(Clone)]
pub struct LogScanner {
    preferred: GlobMatcher,
    any_log: GlobMatcher,
    prefix: String,
}

impl LogScanner {
    pub fn new(prefix: &str) -> Result<Self> {
        Ok(Self {
            preferred: compile(&format!("{}*.log", escape_glob(prefix)))?,
            any_log: compile("*.log")?,
            prefix: prefix.to_string(),
        })
    }

    /// Discover candidate files directly inside `dir`.
    pub fn discover(&self, dir: &Path) -> Result<Discovery> {
        match self.glob_scan(dir) {
            Ok(paths) => Ok(Discovery::Primary(paths)),
            Err(e) => {
                debug!("glob scan of {} failed, listing directory: {e}", dir.display());
                self.list_scan(dir).map(Discovery::Fallback)
            }
        }
    }

    /// Discover and order newest first.
    pub async fn scan(&self, dir: &Path) -> Result<Vec<LogFileRef>> {
        let paths = self.discover(dir)?.into_paths();
        stat_and_sort(paths).await
    }

    fn glob_scan(&self, dir: &Path) -> std::result::Result<Vec<PathBuf>, walkdir::Error> {
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            names.push((entry.file_name().to_string_lossy().into_owned(), entry.into_path()));
        }
        names.sort();
        Ok(self.pick(names))
    }

    fn list_scan(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LogReaderError::DirectoryAccessError {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };
        let mut names: Vec<(String, PathBuf)> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(true))
            .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
            .filter(|(n, _)| !is_hidden(n))
            .collect();
        names.sort();

        let preferred: Vec<PathBuf> = names
            .iter()
            .filter(|(n, _)| n.starts_with(&self.prefix) && n.ends_with(".log"))
            .map(|(_, p)| p.clone())
            .collect();
        if !preferred.is_empty() {
            return Ok(preferred);
        }
        Ok(names
            .into_iter()
            .filter(|(n, _)| n.ends_with(".log"))
            .map(|(_, p)| p)
            .collect())
    }

    fn pick(&self, mut names: Vec<(String, PathBuf)>) -> Vec<PathBuf> {
        names.retain(|(n, _)| !is_hidden(n));
        let preferred: Vec<PathBuf> = names
            .iter()
            .filter(|(n, _)| self.preferred.is_match(n))
            .map(|(_, p)| p.clone())
            .collect();
        if !preferred.is_empty() {
            return preferred;
        }
        names
            .into_iter()
            .filter(|(n, _)| self.any_log.is_match(n))
            .map(|(_, p)| p)
            .collect()
    }
}

/// Stat every path concurrently, then sort by modification time, newest first.
/// Files that disappear before they can be stat'ed are dropped.
pub async fn stat_and_sort(paths: Vec<PathBuf>) -> Result<Vec<LogFileRef>> {
    let stats = join_all(paths.into_iter().map(|path| async move {
        let meta = tokio::fs::metadata(&path).await;
        (path, meta)
    }))
    .await;

    let mut files = Vec::with_capacity(stats.len());
    for (path, meta) in stats {
        match meta {
            Ok(meta) => {
                let modified: DateTime<Utc> = meta.modified()?.into();
                files.push(LogFileRef { path, modified });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("log file vanished before stat: {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    // stable: equal timestamps keep discovery (name) order
    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(files)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| LogReaderError::ConfigError(e.to_string()))
}

fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '{' | '}') {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}
