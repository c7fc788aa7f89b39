//! GitHub tag and release listings.

use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tooldeck_core::{Result, Settings};

use crate::http;

/// Items requested per page.
pub const PER_PAGE: usize = 100;

/// Stop paginating after this many pages.
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// A release as returned by the releases endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    /// Tag the release was cut from.
    pub tag_name: String,
    /// Unpublished draft.
    #[serde(default)]
    pub draft: bool,
    /// Marked as a prerelease on GitHub.
    #[serde(default)]
    pub prerelease: bool,
}

/// Read-only GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client from engine settings.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self::with_client(
            http::client(settings)?,
            &settings.github_api_url,
            settings.github_token.clone(),
        ))
    }

    /// Create a client around an existing HTTP client.
    #[must_use]
    pub fn with_client(http: Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn paginate<T: serde::de::DeserializeOwned>(
        &self,
        owner: &str,
        repo: &str,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/repos/{owner}/{repo}/{endpoint}?per_page={PER_PAGE}&page={page}",
                self.api_url
            );
            let batch: Vec<T> =
                http::get_json(&self.http, &url, self.token.as_deref(), cancel).await?;
            let last = batch.len() < PER_PAGE;
            items.extend(batch);
            if last {
                break;
            }
        }
        debug!(%owner, %repo, %endpoint, count = items.len(), "Listed");
        Ok(items)
    }

    /// All tag names of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Transport, status and decoding failures, each carrying the URL.
    pub async fn list_tags(
        &self,
        owner: &str,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let tags: Vec<Tag> = self.paginate(owner, repo, "tags", cancel).await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    /// All releases of `owner/repo`, drafts included.
    ///
    /// # Errors
    ///
    /// Transport, status and decoding failures, each carrying the URL.
    pub async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Release>> {
        self.paginate(owner, repo, "releases", cancel).await
    }

    /// Tag names of published (non-draft) releases.
    ///
    /// # Errors
    ///
    /// See [`Self::list_releases`].
    pub async fn list_release_tags(
        &self,
        owner: &str,
        repo: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let releases = self.list_releases(owner, repo, cancel).await?;
        Ok(releases
            .into_iter()
            .filter(|r| !r.draft)
            .map(|r| r.tag_name)
            .collect())
    }
}
