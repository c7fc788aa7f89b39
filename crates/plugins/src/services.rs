//! Shared collaborators handed to every bundled plugin.

use reqwest::Client;
use std::fmt;
use std::sync::Arc;

use tooldeck_core::{CommandRunner, Downloader, Platform, Result, Settings};
use tooldeck_install::TokioCommandRunner;
use tooldeck_tools_github::{GitHubClient, HttpDownloader, http};

/// Engine-wide collaborators.
///
/// Built once from [`Settings`]; tests swap individual pieces with the
/// `with_*` methods.
#[derive(Clone)]
pub struct Services {
    /// Engine settings the services were built from.
    pub settings: Settings,
    /// Client for index and listing requests.
    pub http: Client,
    /// GitHub listing client, authenticated when a token is configured.
    pub github: GitHubClient,
    /// Default downloader for archives.
    pub downloader: Arc<dyn Downloader>,
    /// Runs build commands.
    pub runner: Arc<dyn CommandRunner>,
    /// Platform whose binaries are downloaded.
    pub platform: Platform,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("data_dir", &self.settings.data_dir)
            .field("github", &self.github)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Default collaborators for the host platform.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or the host platform is
    /// unsupported.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let platform = Platform::current()?;
        Self::for_platform(settings, platform)
    }

    /// Default collaborators targeting `platform`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn for_platform(settings: Settings, platform: Platform) -> Result<Self> {
        let client = http::client(&settings)?;
        let github = GitHubClient::with_client(
            client.clone(),
            &settings.github_api_url,
            settings.github_token.clone(),
        );
        Ok(Self {
            downloader: Arc::new(HttpDownloader::with_client(client.clone(), None)),
            runner: Arc::new(TokioCommandRunner::new()),
            http: client,
            github,
            settings,
            platform,
        })
    }

    /// Replace the default downloader.
    #[must_use]
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Replace the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }
}
