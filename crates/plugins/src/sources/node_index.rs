use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tooldeck_core::{Result, VersionSource};
use tooldeck_tools_github::http;
use tooldeck_versions::{ChannelEntry, ChannelLabel};

/// One row of a Node-style `index.json`.
#[derive(Debug, Deserialize)]
struct IndexRow {
    version: String,
    #[serde(default)]
    lts: ChannelLabel,
}

/// Versions and release channels from a Node-style JSON index.
///
/// The index lists releases newest first; each entry's `lts` field is
/// `false`, `true` or a codename.
#[derive(Debug, Clone)]
pub struct NodeIndexSource {
    http: Client,
    url: String,
}

impl NodeIndexSource {
    /// Read the index at `url`.
    #[must_use]
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<ChannelEntry>> {
        let rows: Vec<IndexRow> = http::get_json(&self.http, &self.url, None, cancel).await?;
        debug!(url = %self.url, count = rows.len(), "Fetched release index");
        Ok(rows
            .into_iter()
            .map(|row| ChannelEntry::new(row.version, row.lts))
            .collect())
    }
}

#[async_trait]
impl VersionSource for NodeIndexSource {
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        Ok(self
            .fetch(cancel)
            .await?
            .into_iter()
            .map(|entry| entry.version)
            .collect())
    }

    async fn channels(&self, cancel: &CancellationToken) -> Result<Vec<ChannelEntry>> {
        self.fetch(cancel).await
    }
}
