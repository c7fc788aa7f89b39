//! The install pipeline.
//!
//! Stages run strictly in order: artifact short-circuit, directory
//! preparation, download, extraction, pre-build hook, build, post-install
//! hook, artifact verification. Nothing is rolled back once the build has
//! started; re-running `install` after a partial failure is safe because the
//! short-circuit only fires when every expected artifact exists.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tooldeck_core::{
    BuildContext, CommandRunner, Downloader, Error, InstallOutcome, InstallRequest, PluginConfig,
    PostInstallContext, PreBuildContext, Result,
};

use crate::archive::ArchiveDispatcher;

/// Name of the extraction directory inside the download directory.
pub const SOURCE_SUBDIR: &str = "src";

/// Runs downloads and installs for one plugin configuration.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PluginConfig>,
    downloader: Arc<dyn Downloader>,
    runner: Arc<dyn CommandRunner>,
    archives: ArchiveDispatcher,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugin", &self.config.name)
            .field("archives", &self.archives)
            .finish_non_exhaustive()
    }
}

fn ensure_live(cancel: &CancellationToken, operation: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::cancelled(operation));
    }
    Ok(())
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "create directory"))
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "stat artifact"))?;
    if meta.is_dir() {
        return Ok(());
    }
    let mode = meta.permissions().mode();
    if mode & 0o111 != 0o111 {
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o755))
            .await
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "set executable bit"))?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// First directory inside `dir`, by name.
async fn first_subdir(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io(e, Some(dir.to_path_buf()), "read extraction directory"))?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(e, Some(dir.to_path_buf()), "read extraction directory"))?
    {
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        if is_dir {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs.into_iter().next())
}

impl Pipeline {
    /// Create a pipeline for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBuildStepConfigured`] when the configuration has no
    /// build step, before any network or filesystem work.
    pub fn new(
        config: Arc<PluginConfig>,
        downloader: Arc<dyn Downloader>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        config.require_build_step()?;
        Ok(Self {
            config,
            downloader,
            runner,
            archives: ArchiveDispatcher::default(),
        })
    }

    /// Use a custom set of extractors.
    #[must_use]
    pub fn with_archives(mut self, archives: ArchiveDispatcher) -> Self {
        self.archives = archives;
        self
    }

    /// The configuration this pipeline runs.
    #[must_use]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Where the archive for `version` is cached.
    #[must_use]
    pub fn archive_path(&self, version: &str, download_dir: &Path) -> PathBuf {
        download_dir.join(self.config.archive_file_name(version))
    }

    fn downloader(&self) -> &dyn Downloader {
        self.config
            .downloader
            .as_deref()
            .unwrap_or(self.downloader.as_ref())
    }

    async fn source_url(&self, version: &str, cancel: &CancellationToken) -> Result<String> {
        if let Some(resolver) = &self.config.source_resolver {
            return resolver.resolve(version, cancel).await;
        }
        self.config.static_source_url(version).ok_or_else(|| {
            Error::configuration(format!(
                "plugin '{}' has no download URL or source resolver",
                self.config.name
            ))
        })
    }

    /// Fetch the archive for `version` into `download_dir`, reusing a cached
    /// copy larger than the configured minimum size.
    ///
    /// # Errors
    ///
    /// Download failures carry the URL; cancellation is reported as such.
    #[instrument(skip(self, cancel), fields(plugin = %self.config.name))]
    pub async fn download(
        &self,
        version: &str,
        download_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        ensure_live(cancel, "download")?;
        let archive = self.archive_path(version, download_dir);

        if let Ok(meta) = tokio::fs::metadata(&archive).await
            && meta.is_file()
            && meta.len() > self.config.min_archive_size
        {
            debug!(archive = %archive.display(), size = meta.len(), "Using cached archive");
            return Ok(archive);
        }

        let url = self.source_url(version, cancel).await?;
        create_dir(download_dir).await?;
        info!(%url, dest = %archive.display(), "Downloading");
        self.downloader()
            .download(&url, &archive, cancel)
            .await
            .map_err(|e| Error::download(&url, e))?;
        Ok(archive)
    }

    async fn extract(
        &self,
        version: &str,
        archive: &Path,
        download_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        ensure_live(cancel, "extract")?;
        if !archive.is_file() {
            return Err(Error::ArchiveMissing {
                path: archive.to_path_buf(),
            });
        }

        let src_root = download_dir.join(SOURCE_SUBDIR);
        if tokio::fs::metadata(&src_root).await.is_ok() {
            tokio::fs::remove_dir_all(&src_root)
                .await
                .map_err(|e| Error::io(e, Some(src_root.clone()), "clear extraction directory"))?;
        }
        create_dir(&src_root).await?;

        self.archives
            .extract(&self.config.archive_type, archive, &src_root)
            .await?;

        if self.config.auto_detect_extracted_dir {
            return first_subdir(&src_root)
                .await?
                .ok_or(Error::ExtractedDirMissing { path: src_root });
        }

        match &self.config.extracted_dir {
            Some(template) => {
                let dir = src_root.join(self.config.render(template, version));
                if dir.is_dir() {
                    Ok(dir)
                } else {
                    Err(Error::ExtractedDirMissing { path: dir })
                }
            }
            None => Ok(src_root),
        }
    }

    fn artifacts_present(&self, install_dir: &Path) -> bool {
        !self.config.expected_artifacts.is_empty()
            && self
                .config
                .expected_artifacts
                .iter()
                .all(|a| install_dir.join(a).exists())
    }

    /// Set the executable bit on artifacts under the bin directory.
    async fn normalize_permissions(&self, install_dir: &Path) -> Result<()> {
        for artifact in &self.config.expected_artifacts {
            if self.config.is_bin_artifact(artifact) {
                make_executable(&install_dir.join(artifact)).await?;
            }
        }
        Ok(())
    }

    /// Install `request.version` into `request.install_dir`.
    ///
    /// # Errors
    ///
    /// Any stage failure; see [`Error`]. Hook failures are wrapped in
    /// [`Error::Step`] naming the stage.
    #[instrument(
        skip(self, request, cancel),
        fields(plugin = %self.config.name, version = %request.version)
    )]
    pub async fn install(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome> {
        let config = &self.config;
        let version = request.version.as_str();
        let install_dir = request.install_dir.as_path();
        ensure_live(cancel, "install")?;

        if self.artifacts_present(install_dir) {
            info!(install_dir = %install_dir.display(), "Already installed");
            self.normalize_permissions(install_dir).await?;
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        create_dir(install_dir).await?;
        if config.create_bin_dir {
            create_dir(&install_dir.join(&config.bin_dir)).await?;
        }

        // Held until return so the directory is removed on every exit path.
        let scratch;
        let download_dir = if let Some(dir) = &request.download_dir {
            dir.clone()
        } else {
            scratch = TempDir::new()
                .map_err(|e| Error::io(e, None, "create temporary download directory"))?;
            scratch.path().to_path_buf()
        };

        let source_dir = if config.skip_download {
            debug!("Download skipped");
            download_dir.clone()
        } else {
            let archive = self.download(version, &download_dir, cancel).await?;
            if config.skip_extract {
                debug!("Extraction skipped");
                download_dir.clone()
            } else {
                self.extract(version, &archive, &download_dir, cancel).await?
            }
        };
        let runner = self.runner.as_ref();

        if let Some(hook) = &config.hooks.pre_build {
            ensure_live(cancel, "pre-build")?;
            debug!(source_dir = %source_dir.display(), "Running pre-build hook");
            let ctx = PreBuildContext {
                version,
                source_dir: &source_dir,
                runner,
                cancel,
            };
            hook.pre_build(&ctx)
                .await
                .map_err(|e| Error::step("pre-build", e))?;
        }

        let Some(build) = &config.hooks.build else {
            return Err(Error::NoBuildStepConfigured {
                plugin: config.name.clone(),
            });
        };
        ensure_live(cancel, "build")?;
        debug!(source_dir = %source_dir.display(), "Running build step");
        let ctx = BuildContext {
            version,
            source_dir: &source_dir,
            install_dir,
            runner,
            cancel,
        };
        build.build(&ctx).await.map_err(|e| Error::step("build", e))?;

        if let Some(hook) = &config.hooks.post_install {
            ensure_live(cancel, "post-install")?;
            debug!("Running post-install hook");
            let ctx = PostInstallContext {
                version,
                install_dir,
                runner,
                cancel,
            };
            hook.post_install(&ctx)
                .await
                .map_err(|e| Error::step("post-install", e))?;
        }

        for artifact in &config.expected_artifacts {
            let path = install_dir.join(artifact);
            if !path.exists() {
                warn!(artifact = %path.display(), "Expected artifact missing");
                return Err(Error::ArtifactMissing { path });
            }
        }
        self.normalize_permissions(install_dir).await?;

        info!(install_dir = %install_dir.display(), "Installed");
        Ok(InstallOutcome::Installed)
    }
}
