use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tooldeck_core::{PluginConfig, Result, VersionListing, VersionSource};
use tooldeck_tools_github::GitHubClient;

/// Versions from a GitHub repository's releases or tags.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: GitHubClient,
    owner: String,
    repo: String,
    listing: VersionListing,
}

impl GitHubSource {
    /// List `owner/repo` through `client`.
    #[must_use]
    pub fn new(
        client: GitHubClient,
        owner: impl Into<String>,
        repo: impl Into<String>,
        listing: VersionListing,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            listing,
        }
    }

    /// Source for the repository and listing named in `config`.
    #[must_use]
    pub fn for_config(client: GitHubClient, config: &PluginConfig) -> Self {
        Self::new(
            client,
            config.repo_owner.clone(),
            config.repo_name.clone(),
            config.listing,
        )
    }
}

#[async_trait]
impl VersionSource for GitHubSource {
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        debug!(owner = %self.owner, repo = %self.repo, listing = ?self.listing, "Listing versions");
        match self.listing {
            VersionListing::Releases => {
                self.client
                    .list_release_tags(&self.owner, &self.repo, cancel)
                    .await
            }
            VersionListing::Tags => self.client.list_tags(&self.owner, &self.repo, cancel).await,
        }
    }
}
