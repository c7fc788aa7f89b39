//! The uniform interface every tool plugin exposes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tooldeck_versions::ChannelEntry;

use crate::Result;

/// Where to put one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Version to install, without prefix.
    pub version: String,
    /// Where archives are cached. `None` uses a private temporary directory.
    pub download_dir: Option<PathBuf>,
    /// Final installation directory.
    pub install_dir: PathBuf,
}

impl InstallRequest {
    /// Create a request with no download directory.
    #[must_use]
    pub fn new(version: impl Into<String>, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            version: version.into(),
            download_dir: None,
            install_dir: install_dir.into(),
        }
    }

    /// Cache archives in `dir`.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }
}

/// What `install` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every expected artifact was already present; nothing was fetched or built.
    AlreadyInstalled,
    /// The full pipeline ran.
    Installed,
}

/// Produces the raw version list for a tool.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// All published versions, unsorted and possibly prefixed.
    ///
    /// # Errors
    ///
    /// Transport failures and malformed listings.
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// Channel side index, newest first. Sources without channels return an
    /// empty index.
    ///
    /// # Errors
    ///
    /// Transport failures and malformed listings.
    async fn channels(&self, cancel: &CancellationToken) -> Result<Vec<ChannelEntry>> {
        let _ = cancel;
        Ok(Vec::new())
    }
}

/// A managed tool.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Tool name.
    fn name(&self) -> &str;

    /// All installable versions in ascending order.
    async fn list_all(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// The newest stable version, optionally restricted by a prefix query or
    /// a channel alias.
    async fn latest_stable(&self, query: &str, cancel: &CancellationToken) -> Result<String>;

    /// Fetch the archive for `version` into `download_dir` and return its path.
    async fn download(
        &self,
        version: &str,
        download_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;

    /// Run the install pipeline.
    async fn install(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome>;

    /// Directories, relative to the install dir, holding executables.
    fn list_bin_paths(&self) -> Vec<String>;

    /// Environment needed to run the tool from `install_dir`.
    fn exec_env(&self, install_dir: &Path) -> BTreeMap<String, String>;

    /// Version files from other managers this plugin reads.
    fn list_legacy_filenames(&self) -> Vec<String>;

    /// Read a version from a legacy version file.
    async fn parse_legacy_file(&self, path: &Path) -> Result<String>;

    /// Remove an installation.
    async fn uninstall(&self, install_dir: &Path, cancel: &CancellationToken) -> Result<()>;
}
