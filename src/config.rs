use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogReaderError, Result};

pub const DEFAULT_APP_NAME: &str = "Claude";
pub const DEFAULT_FILE_PREFIX: &str = "mcp";
pub const DEFAULT_MAX_BYTES_PER_FILE: usize = 100 * 1024;
pub const DEFAULT_MAX_TOTAL_BYTES: usize = 500 * 1024;
pub const DIAGNOSTIC_FILE_NAME: &str = "mcp_debug.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    #[default]
    Stdio,
    Http,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub mode: ServerMode,
    pub http_addr: Option<String>,
    pub http_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::Stdio,
            http_addr: None,
            http_port: None,
        }
    }
}

/// Where log files are looked up and how much of them may be returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSourceConfig {
    /// Application whose log directory is used when no custom path is given.
    pub app_name: String,
    /// Preferred file name prefix; `<prefix>*.log` wins over plain `*.log`.
    pub file_prefix: String,
    /// Overrides the home directory taken from the environment.
    pub home_dir: Option<PathBuf>,
    /// Overrides the detected platform layout.
    pub platform: Option<Platform>,
    pub max_bytes_per_file: usize,
    pub max_total_bytes: usize,
}

impl Default for LogSourceConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            home_dir: None,
            platform: None,
            max_bytes_per_file: DEFAULT_MAX_BYTES_PER_FILE,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Append-only troubleshooting file. `None` means `mcp_debug.log` in the
    /// working directory captured at startup.
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logs: LogSourceConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl Config {
    /// Load from a `.yaml`/`.yml` or `.json` file. Missing sections fall back to defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LogReaderError::ConfigError(format!("read {} failed: {e}", path.display()))
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => serde_json::from_str(&raw)
                .map_err(|e| LogReaderError::ConfigError(format!("invalid json config: {e}"))),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| LogReaderError::ConfigError(format!("invalid yaml config: {e}"))),
            _ => Err(LogReaderError::ConfigError(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Fill in values that come from the process environment so the rest of
    /// the crate never reads ambient state.
    pub fn resolve_environment(mut self) -> Self {
        if self.logs.home_dir.is_none() {
            self.logs.home_dir = home_dir_from_env();
        }
        if self.logs.platform.is_none() {
            self.logs.platform = Some(Platform::current());
        }
        if self.diagnostics.log_path.is_none() {
            if let Ok(cwd) = std::env::current_dir() {
                self.diagnostics.log_path = Some(cwd.join(DIAGNOSTIC_FILE_NAME));
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    /// Platform-specific default log directory for `app_name` under `home`.
    pub fn default_log_dir(self, home: &Path, app_name: &str) -> PathBuf {
        match self {
            Platform::MacOs => home.join("Library").join("Logs").join(app_name),
            Platform::Windows => home
                .join("AppData")
                .join("Roaming")
                .join(app_name)
                .join("logs"),
            Platform::Other => home.join(".config").join(app_name).join("logs"),
        }
    }
}

fn home_dir_from_env() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|key| std::env::var_os(key))
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_log_dir_per_platform() {
        let home = Path::new("/home/u");
        assert_eq!(
            Platform::MacOs.default_log_dir(home, "Claude"),
            home.join("Library/Logs/Claude")
        );
        assert_eq!(
            Platform::Windows.default_log_dir(home, "Claude"),
            home.join("AppData/Roaming/Claude/logs")
        );
        assert_eq!(
            Platform::Other.default_log_dir(home, "Claude"),
            home.join(".config/Claude/logs")
        );
    }

    #[test]
    fn load_partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "logs:\n  app_name: Demo\nserver:\n  mode: both\n").unwrap();

        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.logs.app_name, "Demo");
        assert_eq!(cfg.logs.file_prefix, DEFAULT_FILE_PREFIX);
        assert_eq!(cfg.logs.max_total_bytes, DEFAULT_MAX_TOTAL_BYTES);
        assert_eq!(cfg.server.mode, ServerMode::Both);
    }

    #[test]
    fn load_json_and_reject_unknown_extension() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("cfg.json");
        std::fs::write(&json, r#"{"logs": {"platform": "windows", "max_bytes_per_file": 10}}"#)
            .unwrap();
        let cfg = Config::load_from_path(&json).unwrap();
        assert_eq!(cfg.logs.platform, Some(Platform::Windows));
        assert_eq!(cfg.logs.max_bytes_per_file, 10);

        let toml = dir.path().join("cfg.toml");
        std::fs::write(&toml, "x = 1").unwrap();
        let err = Config::load_from_path(&toml).unwrap_err();
        assert!(matches!(err, LogReaderError::ConfigError(_)));
    }

    #[test]
    fn resolve_environment_keeps_explicit_values() {
        let mut cfg = Config::default();
        cfg.logs.home_dir = Some(PathBuf::from("/srv/home"));
        cfg.logs.platform = Some(Platform::MacOs);
        cfg.diagnostics.log_path = Some(PathBuf::from("/tmp/diag.log"));

        let cfg = cfg.resolve_environment();
        assert_eq!(cfg.logs.home_dir, Some(PathBuf::from("/srv/home")));
        assert_eq!(cfg.logs.platform, Some(Platform::MacOs));
        assert_eq!(cfg.diagnostics.log_path, Some(PathBuf::from("/tmp/diag.log")));
    }
}
