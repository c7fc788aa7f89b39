//! `node`: Node.js binary distributions.
//!
//! Versions and LTS channels come from the dist `index.json`. Download URLs
//! depend on the host platform, so they are computed by [`NodeDistResolver`]
//! rather than a template, and each archive is checked against the release's
//! `SHASUMS256.txt` when one is published.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tooldeck_core::{
    Arch, ArchiveKind, Downloader, Error, Os, Platform, PluginConfig, Result, SourceResolver,
};
use tooldeck_install::CopyTree;
use tooldeck_tools_github::checksum;
use tooldeck_versions::ChannelAliases;

use crate::engine::ConfiguredPlugin;
use crate::services::Services;
use crate::sources::NodeIndexSource;

/// Plugin name.
pub const NAME: &str = "node";
/// Official distribution root holding `index.json` and release directories.
pub const DEFAULT_DIST_URL: &str = "https://nodejs.org/dist";
const CHECKSUM_FILE: &str = "SHASUMS256.txt";

fn dist_os(os: Os) -> &'static str {
    match os {
        Os::Linux => "linux",
        Os::Darwin => "darwin",
        Os::Windows => "win",
    }
}

fn dist_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86_64 => "x64",
        Arch::Arm64 => "arm64",
    }
}

fn archive_kind(platform: Platform) -> ArchiveKind {
    match platform.os {
        Os::Windows => ArchiveKind::Zip,
        Os::Linux | Os::Darwin => ArchiveKind::TarGz,
    }
}

/// Computes `{dist}/v{version}/node-v{version}-{os}-{arch}.{ext}`.
#[derive(Debug, Clone)]
pub struct NodeDistResolver {
    dist_url: String,
    platform: Platform,
}

impl NodeDistResolver {
    /// Resolve against `dist_url` for `platform`.
    #[must_use]
    pub fn new(dist_url: &str, platform: Platform) -> Self {
        Self {
            dist_url: dist_url.trim_end_matches('/').to_string(),
            platform,
        }
    }

    /// File name of the distribution archive for `version`.
    #[must_use]
    pub fn file_name(&self, version: &str) -> String {
        format!(
            "node-v{version}-{}-{}.{}",
            dist_os(self.platform.os),
            dist_arch(self.platform.arch),
            archive_kind(self.platform)
        )
    }

    /// Download URL of the archive for `version`.
    #[must_use]
    pub fn url(&self, version: &str) -> String {
        format!("{}/v{version}/{}", self.dist_url, self.file_name(version))
    }
}

#[async_trait]
impl SourceResolver for NodeDistResolver {
    async fn resolve(&self, version: &str, _cancel: &CancellationToken) -> Result<String> {
        Ok(self.url(version))
    }
}

/// Wraps a downloader and verifies each file against the `SHASUMS256.txt`
/// published next to it.
///
/// A missing checksum list, or a list without an entry for the file, is
/// logged and accepted. A digest mismatch removes the file and fails.
pub struct ChecksumVerifyingDownloader {
    inner: Arc<dyn Downloader>,
}

impl std::fmt::Debug for ChecksumVerifyingDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumVerifyingDownloader")
            .finish_non_exhaustive()
    }
}

impl ChecksumVerifyingDownloader {
    /// Verify files fetched by `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn Downloader>) -> Self {
        Self { inner }
    }

    /// Fetch the checksum list, treating any failure other than
    /// cancellation as "not published".
    async fn fetch_list(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let mut name = dest.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{CHECKSUM_FILE}"));
        let list_path = dest.with_file_name(name);

        let fetched = self.inner.download(url, &list_path, cancel).await;
        let list = match fetched {
            Ok(()) => tokio::fs::read_to_string(&list_path)
                .await
                .map_err(|e| Error::io(e, Some(list_path.clone()), "read checksum list")),
            Err(e) => Err(e),
        };
        if let Err(e) = tokio::fs::remove_file(&list_path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(path = %list_path.display(), error = %e, "Failed to remove checksum list");
        }

        match list {
            Ok(list) => Ok(Some(list)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(%url, error = %e, "Checksum list unavailable, skipping verification");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Downloader for ChecksumVerifyingDownloader {
    async fn download(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<()> {
        self.inner.download(url, dest, cancel).await?;

        let Some((dir, file_name)) = url.rsplit_once('/') else {
            return Ok(());
        };
        let list_url = format!("{dir}/{CHECKSUM_FILE}");
        let Some(list) = self.fetch_list(&list_url, dest, cancel).await? else {
            return Ok(());
        };
        let Some(expected) = checksum::find_checksum(&list, file_name) else {
            warn!(%url, file = file_name, "No checksum entry, skipping verification");
            return Ok(());
        };

        if let Err(e) = checksum::verify_sha256(dest, &expected).await {
            if let Err(cleanup) = tokio::fs::remove_file(dest).await {
                warn!(path = %dest.display(), error = %cleanup, "Failed to remove corrupt download");
            }
            return Err(e);
        }
        debug!(%url, "Checksum verified");
        Ok(())
    }
}

/// Configuration for `platform`, downloading from `dist_url` through
/// `downloader`.
///
/// # Errors
///
/// Propagates builder validation errors.
pub fn config(
    dist_url: &str,
    platform: Platform,
    downloader: Arc<dyn Downloader>,
) -> Result<PluginConfig> {
    let builder = PluginConfig::builder(NAME)
        .repo("nodejs", "node")
        .archive_type(archive_kind(platform).tag())
        .source_resolver(NodeDistResolver::new(dist_url, platform))
        .downloader(Arc::new(ChecksumVerifyingDownloader::new(downloader)))
        .auto_detect_extracted_dir(true)
        .channel_aliases(ChannelAliases::new("lts"))
        .legacy_filename(".nvmrc")
        .legacy_filename(".node-version");

    // Windows archives keep node.exe at the top level.
    let builder = match platform.os {
        Os::Windows => builder
            .build_step(CopyTree::new().target("bin"))
            .artifact("bin/node.exe"),
        Os::Linux | Os::Darwin => builder.build_step(CopyTree::new()).artifact("bin/node"),
    };
    builder.build()
}

/// The `node` plugin reading `{dist_url}/index.json`.
///
/// # Errors
///
/// See [`config`].
pub fn plugin(services: &Services, dist_url: &str) -> Result<ConfiguredPlugin> {
    let dist_url = dist_url.trim_end_matches('/');
    let config = config(dist_url, services.platform, Arc::clone(&services.downloader))?;
    let source = NodeIndexSource::new(services.http.clone(), format!("{dist_url}/index.json"));
    ConfiguredPlugin::with_services(config, Arc::new(source), services)
}
