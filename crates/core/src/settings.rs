//! Engine settings.
//!
//! Resolved from built-in defaults, then an optional TOML file, then
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Overrides the data directory.
pub const ENV_DATA_DIR: &str = "TOOLDECK_DATA_DIR";
/// Overrides the archive download directory.
pub const ENV_DOWNLOAD_DIR: &str = "TOOLDECK_DOWNLOAD_DIR";
/// Overrides the HTTP timeout, in seconds.
pub const ENV_HTTP_TIMEOUT: &str = "TOOLDECK_HTTP_TIMEOUT";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_DOWNLOAD_URL: &str = "https://github.com";

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root for installs and cached downloads.
    pub data_dir: PathBuf,
    /// Shared archive cache. Defaults to per-version directories under `data_dir`.
    pub download_dir: Option<PathBuf>,
    /// Token for GitHub API requests.
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    /// Per-request timeout.
    pub http_timeout_secs: u64,
    /// GitHub REST API base URL.
    pub github_api_url: String,
    /// Base URL for release asset downloads.
    pub github_download_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            download_dir: None,
            github_token: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_download_url: DEFAULT_GITHUB_DOWNLOAD_URL.to_string(),
        }
    }
}

/// `<data dir>/tooldeck`, falling back to the temp dir.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tooldeck")
}

/// `<config dir>/tooldeck/config.toml`, if a config dir exists.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tooldeck").join("config.toml"))
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, the default config path is
    /// read if present.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid config files and invalid environment values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply_env()?;
        Ok(settings)
    }

    /// Parse a TOML settings file.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid files.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read settings"))?;
        toml::from_str(&text).map_err(|e| {
            Error::configuration(format!("invalid settings file {}: {e}", path.display()))
        })
    }

    /// Apply environment overrides.
    ///
    /// # Errors
    ///
    /// A non-numeric `TOOLDECK_HTTP_TIMEOUT`.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = non_empty_var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_var(ENV_DOWNLOAD_DIR) {
            self.download_dir = Some(PathBuf::from(dir));
        }
        if let Some(timeout) = non_empty_var(ENV_HTTP_TIMEOUT) {
            self.http_timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::configuration(format!(
                    "{ENV_HTTP_TIMEOUT} must be a number of seconds, got '{timeout}'"
                ))
            })?;
        }
        if let Some(token) = non_empty_var("GITHUB_TOKEN").or_else(|| non_empty_var("GH_TOKEN")) {
            self.github_token = Some(token);
        }
        Ok(())
    }

    /// HTTP timeout as a duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Install directory for one tool version.
    #[must_use]
    pub fn install_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.data_dir.join("installs").join(tool).join(version)
    }

    /// Download directory for one tool version.
    #[must_use]
    pub fn download_dir(&self, tool: &str, version: &str) -> PathBuf {
        match &self.download_dir {
            Some(dir) => dir.join(tool).join(version),
            None => self.data_dir.join("downloads").join(tool).join(version),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
