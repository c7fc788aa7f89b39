//! Streaming HTTP downloader.

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tooldeck_core::{Downloader, Error, Result, Settings};

use crate::http;

/// Downloads over HTTP(S), streaming to a `.part` file renamed into place on
/// success. A failed or cancelled download leaves nothing at `dest`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    http: Client,
    token: Option<String>,
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

impl HttpDownloader {
    /// Create a downloader from engine settings.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self::with_client(http::client(settings)?, None))
    }

    /// Create a downloader around an existing client. The token, if any, is
    /// sent with every request.
    #[must_use]
    pub fn with_client(http: Client, token: Option<String>) -> Self {
        Self { http, token }
    }

    async fn stream_to(&self, url: &str, part: &Path, cancel: &CancellationToken) -> Result<u64> {
        let mut response = http::get(&self.http, url, self.token.as_deref(), cancel).await?;
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| Error::io(e, Some(part.to_path_buf()), "create download file"))?;

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                chunk = response.chunk() => chunk.map_err(|e| Error::transport(url, e.to_string()))?,
                () = cancel.cancelled() => return Err(Error::cancelled(format!("download {url}"))),
            };
            let Some(chunk) = chunk else { break };
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, Some(part.to_path_buf()), "write download"))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| Error::io(e, Some(part.to_path_buf()), "flush download"))?;
        Ok(written)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<()> {
        let part = part_path(dest);
        match self.stream_to(url, &part, cancel).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, dest)
                    .await
                    .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "move download into place"))?;
                debug!(%url, bytes, dest = %dest.display(), "Downloaded");
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(part = %part.display(), error = %cleanup, "Failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}
