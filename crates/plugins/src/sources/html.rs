use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tooldeck_core::{Error, Result, VersionSource};
use tooldeck_tools_github::http;

const HREF_PATTERN: &str = r#"(?i)href\s*=\s*"([^"]*)""#;

/// Versions scraped from an FTP-style HTML directory listing.
///
/// Every `href` is matched against a caller-supplied pattern. The first
/// capture group is the version; without a group the whole match is used.
#[derive(Debug, Clone)]
pub struct HtmlIndexSource {
    http: Client,
    url: String,
    href: Regex,
    pattern: Regex,
}

impl HtmlIndexSource {
    /// Create a source reading `url`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `pattern` is not a valid regex.
    pub fn new(http: Client, url: impl Into<String>, pattern: &str) -> Result<Self> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| Error::configuration(format!("invalid version pattern '{p}': {e}")))
        };
        Ok(Self {
            http,
            url: url.into(),
            href: compile(HREF_PATTERN)?,
            pattern: compile(pattern)?,
        })
    }

    /// Versions linked from an index page.
    #[must_use]
    pub fn parse(&self, page: &str) -> Vec<String> {
        self.href
            .captures_iter(page)
            .filter_map(|href| href.get(1))
            .filter_map(|href| {
                let caps = self.pattern.captures(href.as_str())?;
                caps.get(1).or_else(|| caps.get(0))
            })
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl VersionSource for HtmlIndexSource {
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let page = http::get_text(&self.http, &self.url, None, cancel).await?;
        let versions = self.parse(&page);
        debug!(url = %self.url, count = versions.len(), "Parsed directory index");
        Ok(versions)
    }
}
