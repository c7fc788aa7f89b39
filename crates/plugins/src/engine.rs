//! The generic plugin: a [`PluginConfig`], a version source and the install
//! pipeline behind the uniform [`Plugin`] interface.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use tooldeck_core::{
    CommandRunner, Downloader, Error, InstallOutcome, InstallRequest, Plugin, PluginConfig, Result,
    VersionSource,
};
use tooldeck_install::{ArchiveDispatcher, Pipeline};
use tooldeck_versions::{dedup_sorted, resolve_channel, select_latest, sort};

use crate::services::Services;

/// Placeholder expanded in `exec_env` values.
pub const INSTALL_DIR_PLACEHOLDER: &str = "{install_dir}";

/// A plugin driven entirely by its configuration.
#[derive(Clone)]
pub struct ConfiguredPlugin {
    config: Arc<PluginConfig>,
    source: Arc<dyn VersionSource>,
    pipeline: Pipeline,
}

impl std::fmt::Debug for ConfiguredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredPlugin")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl ConfiguredPlugin {
    /// Assemble a plugin from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBuildStepConfigured`] if `config` has no build step.
    pub fn new(
        config: PluginConfig,
        source: Arc<dyn VersionSource>,
        downloader: Arc<dyn Downloader>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pipeline = Pipeline::new(Arc::clone(&config), downloader, runner)?;
        Ok(Self {
            config,
            source,
            pipeline,
        })
    }

    /// Assemble a plugin using the shared downloader and runner.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_services(
        config: PluginConfig,
        source: Arc<dyn VersionSource>,
        services: &Services,
    ) -> Result<Self> {
        Self::new(
            config,
            source,
            Arc::clone(&services.downloader),
            Arc::clone(&services.runner),
        )
    }

    /// Use a custom set of extractors.
    #[must_use]
    pub fn with_archives(mut self, archives: ArchiveDispatcher) -> Self {
        self.pipeline = self.pipeline.with_archives(archives);
        self
    }

    /// The configuration this plugin runs.
    #[must_use]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Strip prefixes, drop blanks, sort ascending and de-duplicate.
    fn normalize(&self, raw: &[String]) -> Vec<String> {
        let stripped: Vec<&str> = raw
            .iter()
            .map(|v| self.config.strip_prefix(v.trim()))
            .filter(|v| !v.is_empty())
            .collect();
        dedup_sorted(sort(&stripped))
    }
}

#[async_trait]
impl Plugin for ConfiguredPlugin {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn list_all(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let raw = self.source.list(cancel).await?;
        let versions = self.normalize(&raw);
        debug!(plugin = %self.config.name, count = versions.len(), "Listed versions");
        Ok(versions)
    }

    #[instrument(skip(self, cancel), fields(plugin = %self.config.name))]
    async fn latest_stable(&self, query: &str, cancel: &CancellationToken) -> Result<String> {
        if let Some(aliases) = &self.config.channel_aliases
            && let Some(channel) = aliases.parse(query)
        {
            let index = self.source.channels(cancel).await?;
            let version = resolve_channel(&index, &channel)?;
            return Ok(self.config.strip_prefix(&version).to_string());
        }

        let versions = self.list_all(cancel).await?;
        let query = self.config.strip_prefix(query.trim());
        let latest = select_latest(&versions, Some(query), &self.config.select)?;
        debug!(%latest, "Selected latest version");
        Ok(latest)
    }

    async fn download(
        &self,
        version: &str,
        download_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.pipeline.download(version, download_dir, cancel).await
    }

    async fn install(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome> {
        self.pipeline.install(request, cancel).await
    }

    fn list_bin_paths(&self) -> Vec<String> {
        vec![self.config.bin_dir.clone()]
    }

    fn exec_env(&self, install_dir: &Path) -> BTreeMap<String, String> {
        let dir = install_dir.display().to_string();
        self.config
            .exec_env
            .iter()
            .map(|(key, value)| (key.clone(), value.replace(INSTALL_DIR_PLACEHOLDER, &dir)))
            .collect()
    }

    fn list_legacy_filenames(&self) -> Vec<String> {
        self.config.legacy_filenames.clone()
    }

    async fn parse_legacy_file(&self, path: &Path) -> Result<String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read version file"))?;
        contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| self.config.strip_prefix(line).to_string())
            .ok_or_else(|| {
                Error::configuration(format!("no version found in {}", path.display()))
            })
    }

    async fn uninstall(&self, install_dir: &Path, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!("uninstall {}", self.config.name)));
        }
        match tokio::fs::remove_dir_all(install_dir).await {
            Ok(()) => {
                info!(plugin = %self.config.name, dir = %install_dir.display(), "Uninstalled");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %install_dir.display(), "Nothing to uninstall");
                Ok(())
            }
            Err(e) => Err(Error::io(
                e,
                Some(install_dir.to_path_buf()),
                "remove install directory",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tooldeck_install::{CopyTree, TokioCommandRunner};
    use tooldeck_testkit::StaticDownloader;
    use tooldeck_versions::{ChannelAliases, ChannelEntry, ChannelLabel};

    struct Listed {
        versions: Vec<&'static str>,
        channels: Vec<ChannelEntry>,
    }

    #[async_trait]
    impl VersionSource for Listed {
        async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<String>> {
            Ok(self.versions.iter().map(ToString::to_string).collect())
        }

        async fn channels(&self, _cancel: &CancellationToken) -> Result<Vec<ChannelEntry>> {
            Ok(self.channels.clone())
        }
    }

    fn plugin(config: PluginConfig, versions: Vec<&'static str>) -> ConfiguredPlugin {
        let source = Listed {
            versions,
            channels: vec![
                ChannelEntry::new("v21.5.0", ChannelLabel::NoChannel),
                ChannelEntry::new("v20.10.0", ChannelLabel::NamedChannel("Iron".into())),
                ChannelEntry::new("v18.19.0", ChannelLabel::NamedChannel("Hydrogen".into())),
            ],
        };
        ConfiguredPlugin::new(
            config,
            Arc::new(source),
            Arc::new(StaticDownloader::new()),
            Arc::new(TokioCommandRunner::new()),
        )
        .unwrap()
    }

    fn config() -> tooldeck_core::PluginConfigBuilder {
        PluginConfig::builder("tool").build_step(CopyTree::new())
    }

    #[tokio::test]
    async fn test_list_all_strips_sorts_and_dedups() {
        let p = plugin(
            config().build().unwrap(),
            vec!["v1.10.0", "v1.2.0", "1.2.0", "v", " v1.9.0 "],
        );
        let versions = p.list_all(&CancellationToken::new()).await.unwrap();
        assert_eq!(versions, vec!["1.2.0", "1.9.0", "1.10.0"]);
    }

    #[tokio::test]
    async fn test_latest_stable_prefers_stable_within_query() {
        let p = plugin(
            config().build().unwrap(),
            vec!["v1.27.0", "v1.28.0", "v1.29.0-rc1", "v2.0.0"],
        );
        let cancel = CancellationToken::new();
        assert_eq!(p.latest_stable("", &cancel).await.unwrap(), "2.0.0");
        assert_eq!(p.latest_stable("1", &cancel).await.unwrap(), "1.28.0");
        assert_eq!(p.latest_stable("v1.27", &cancel).await.unwrap(), "1.27.0");
    }

    #[tokio::test]
    async fn test_latest_stable_unmatched_query() {
        let p = plugin(config().build().unwrap(), vec!["v1.0.0"]);
        let err = p
            .latest_stable("9", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Versions(tooldeck_versions::Error::NoVersionsMatching { .. })
        ));
    }

    #[tokio::test]
    async fn test_latest_stable_channel_aliases() {
        let p = plugin(
            config()
                .channel_aliases(ChannelAliases::new("lts"))
                .build()
                .unwrap(),
            vec!["v21.5.0", "v20.10.0", "v18.19.0"],
        );
        let cancel = CancellationToken::new();
        assert_eq!(p.latest_stable("lts", &cancel).await.unwrap(), "20.10.0");
        assert_eq!(
            p.latest_stable("lts/hydrogen", &cancel).await.unwrap(),
            "18.19.0"
        );
        assert_eq!(p.latest_stable("21", &cancel).await.unwrap(), "21.5.0");
        let err = p.latest_stable("lts/argon", &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Versions(tooldeck_versions::Error::ChannelNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_channel_alias_ignored_without_aliases() {
        let p = plugin(config().build().unwrap(), vec!["v1.0.0"]);
        let err = p
            .latest_stable("lts", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Versions(tooldeck_versions::Error::NoVersionsMatching { .. })
        ));
    }

    #[test]
    fn test_bin_paths_and_exec_env() {
        let p = plugin(
            config()
                .bin_dir("libexec/bin")
                .exec_env("TOOL_HOME", "{install_dir}")
                .exec_env("TOOL_LIB", "{install_dir}/lib")
                .build()
                .unwrap(),
            vec![],
        );
        assert_eq!(p.list_bin_paths(), vec!["libexec/bin"]);
        let env = p.exec_env(Path::new("/opt/tool/1.0"));
        assert_eq!(env["TOOL_HOME"], "/opt/tool/1.0");
        assert_eq!(env["TOOL_LIB"], "/opt/tool/1.0/lib");
    }

    #[tokio::test]
    async fn test_parse_legacy_file() {
        let p = plugin(
            config().legacy_filename(".tool-version").build().unwrap(),
            vec![],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tool-version");
        tokio::fs::write(&path, "\n# pinned\n  v1.4.2  \n2.0.0\n")
            .await
            .unwrap();

        assert_eq!(p.list_legacy_filenames(), vec![".tool-version"]);
        assert_eq!(p.parse_legacy_file(&path).await.unwrap(), "1.4.2");
    }

    #[tokio::test]
    async fn test_parse_legacy_file_without_version() {
        let p = plugin(config().build().unwrap(), vec![]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tool-version");
        tokio::fs::write(&path, "# nothing here\n\n").await.unwrap();
        let err = p.parse_legacy_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_uninstall_is_idempotent() {
        let p = plugin(config().build().unwrap(), vec![]);
        let dir = tempfile::tempdir().unwrap();
        let install = dir.path().join("1.0.0");
        tokio::fs::create_dir_all(install.join("bin")).await.unwrap();
        tokio::fs::write(install.join("bin/tool"), "x").await.unwrap();
        let cancel = CancellationToken::new();

        p.uninstall(&install, &cancel).await.unwrap();
        assert!(!install.exists());
        p.uninstall(&install, &cancel).await.unwrap();
    }
}
