//! Integration tests for the install pipeline.
//!
//! Every test wires the pipeline to in-memory collaborators from the testkit:
//! a static downloader, a recording command runner and archive fixtures.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tooldeck_core::{
    BuildContext, BuildHook, Error, InstallOutcome, InstallRequest, PluginConfig, PostInstallContext,
    PostInstallHook, PreBuildContext, PreBuildHook, Result, SourceResolver,
};
use tooldeck_install::{CopyTree, Pipeline};
use tooldeck_testkit::{FixtureFile, RecordingRunner, StaticDownloader, WriteFilesStep, archives};

const ZIP_URL: &str = "https://dl.test/tool/1.0.0/tool.zip";

fn pipeline(config: PluginConfig, downloader: &StaticDownloader) -> Pipeline {
    Pipeline::new(
        Arc::new(config),
        Arc::new(downloader.clone()),
        Arc::new(RecordingRunner::new()),
    )
    .unwrap()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).unwrap().permissions().mode() & 0o111 == 0o111
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.exists()
}

/// Copies `<src>/tool` to `<install>/bin/tool`.
struct PlaceBinary;

#[async_trait]
impl BuildHook for PlaceBinary {
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let dest = ctx.install_dir.join("bin").join("tool");
        tokio::fs::copy(ctx.source_dir.join("tool"), &dest)
            .await
            .map_err(|e| Error::io(e, Some(dest), "copy tool"))?;
        Ok(())
    }
}

/// Records the hook stages it sees.
#[derive(Clone, Default)]
struct StageLog(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl PreBuildHook for StageLog {
    async fn pre_build(&self, ctx: &PreBuildContext<'_>) -> Result<()> {
        self.0.lock().push(format!("pre-build {}", ctx.version));
        Ok(())
    }
}

#[async_trait]
impl BuildHook for StageLog {
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        self.0.lock().push(format!("build {}", ctx.version));
        tokio::fs::create_dir_all(ctx.install_dir.join("bin")).await.unwrap();
        tokio::fs::write(ctx.install_dir.join("bin/tool"), "x").await.unwrap();
        Ok(())
    }
}

#[async_trait]
impl PostInstallHook for StageLog {
    async fn post_install(&self, ctx: &PostInstallContext<'_>) -> Result<()> {
        self.0.lock().push(format!("post-install {}", ctx.version));
        Ok(())
    }
}

/// Records the source directory handed to the build step, then fails if
/// asked to.
#[derive(Clone, Default)]
struct SourceDirLog {
    seen: Arc<Mutex<Option<PathBuf>>>,
    fail: bool,
}

impl SourceDirLog {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn seen(&self) -> PathBuf {
        self.seen.lock().clone().expect("build step did not run")
    }
}

#[async_trait]
impl BuildHook for SourceDirLog {
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        *self.seen.lock() = Some(ctx.source_dir.to_path_buf());
        if self.fail {
            return Err(Error::configuration("build failed"));
        }
        tokio::fs::write(ctx.install_dir.join("bin/tool"), "x")
            .await
            .map_err(|e| Error::io(e, None, "write tool"))?;
        Ok(())
    }
}

fn zip_with_tool() -> Vec<u8> {
    archives::zip(&[FixtureFile::new("tool", b"#!/bin/sh\necho tool\n")]).unwrap()
}

fn zip_config() -> tooldeck_core::PluginConfigBuilder {
    PluginConfig::builder("tool")
        .download_url("https://dl.test/{{.Name}}/{{.Version}}/tool.zip")
        .archive_type("zip")
        .create_bin_dir(true)
        .artifact("bin/tool")
}

// =============================================================================
// Short-circuit and caching
// =============================================================================

#[tokio::test]
async fn test_existing_artifacts_short_circuit() {
    let install = TempDir::new().unwrap();
    std::fs::create_dir_all(install.path().join("bin")).unwrap();
    std::fs::write(install.path().join("bin/tool"), "#!/bin/sh\n").unwrap();

    let step = WriteFilesStep::new();
    let downloader = StaticDownloader::new();
    let config = PluginConfig::builder("tool")
        .download_url("https://dl.test/tool.zip")
        .artifact("bin/tool")
        .build_step(step.clone())
        .build()
        .unwrap();

    let outcome = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
    assert!(downloader.requests().is_empty());
    assert_eq!(step.calls(), 0);
    assert!(is_executable(&install.path().join("bin/tool")));
}

#[tokio::test]
async fn test_cached_archive_skips_download() {
    let downloads = TempDir::new().unwrap();
    std::fs::write(downloads.path().join("tool-1.0.0.zip"), vec![b'z'; 2048]).unwrap();

    let downloader = StaticDownloader::new();
    let config = zip_config().build_step(PlaceBinary).build().unwrap();
    let path = pipeline(config, &downloader)
        .download("1.0.0", downloads.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(path, downloads.path().join("tool-1.0.0.zip"));
    assert!(downloader.requests().is_empty());
}

#[tokio::test]
async fn test_small_cached_archive_is_refetched() {
    let downloads = TempDir::new().unwrap();
    std::fs::write(downloads.path().join("tool-1.0.0.zip"), b"partial").unwrap();

    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config().build_step(PlaceBinary).build().unwrap();
    pipeline(config, &downloader)
        .download("1.0.0", downloads.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(downloader.requests(), vec![ZIP_URL]);
    assert_eq!(
        std::fs::read(downloads.path().join("tool-1.0.0.zip")).unwrap(),
        zip_with_tool()
    );
}

// =============================================================================
// Full installs
// =============================================================================

#[tokio::test]
async fn test_zip_install_runs_build_and_sets_exec_bit() {
    let install = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config().build_step(PlaceBinary).build().unwrap();

    let request = InstallRequest::new("1.0.0", install.path()).with_download_dir(downloads.path());
    let outcome = pipeline(config, &downloader)
        .install(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, InstallOutcome::Installed);
    let tool = install.path().join("bin/tool");
    assert!(tool.is_file());
    assert!(is_executable(&tool));
    assert!(downloads.path().join("src/tool").is_file());
}

#[tokio::test]
async fn test_second_install_short_circuits() {
    let install = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let pipeline = pipeline(zip_config().build_step(PlaceBinary).build().unwrap(), &downloader);
    let request = InstallRequest::new("1.0.0", install.path());
    let cancel = CancellationToken::new();

    assert_eq!(
        pipeline.install(&request, &cancel).await.unwrap(),
        InstallOutcome::Installed
    );
    assert_eq!(
        pipeline.install(&request, &cancel).await.unwrap(),
        InstallOutcome::AlreadyInstalled
    );
    assert_eq!(downloader.requests().len(), 1);
}

#[tokio::test]
async fn test_hooks_run_in_order() {
    let install = TempDir::new().unwrap();
    let log = StageLog::default();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config()
        .pre_build(log.clone())
        .build_step(log.clone())
        .post_install(log.clone())
        .build()
        .unwrap();

    pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        *log.0.lock(),
        vec!["pre-build 1.0.0", "build 1.0.0", "post-install 1.0.0"]
    );
}

#[tokio::test]
async fn test_auto_detected_extracted_dir() {
    let install = TempDir::new().unwrap();
    let url = "https://dl.test/node-v20.0.0.tar.gz";
    let tarball = archives::tar_gz(&[
        FixtureFile::new("node-v20.0.0-linux-x64/bin/node", b"node"),
        FixtureFile::new("node-v20.0.0-linux-x64/LICENSE", b"MIT"),
    ])
    .unwrap();
    let downloader = StaticDownloader::new().with(url, tarball);
    let config = PluginConfig::builder("node")
        .download_url(url)
        .auto_detect_extracted_dir(true)
        .artifact("bin/node")
        .build_step(CopyTree::new())
        .build()
        .unwrap();

    pipeline(config, &downloader)
        .install(
            &InstallRequest::new("20.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(is_executable(&install.path().join("bin/node")));
    assert!(install.path().join("LICENSE").is_file());
}

#[tokio::test]
async fn test_source_resolver_overrides_template() {
    struct Fixed;

    #[async_trait]
    impl SourceResolver for Fixed {
        async fn resolve(&self, version: &str, _cancel: &CancellationToken) -> Result<String> {
            Ok(format!("https://mirror.test/{version}.zip"))
        }
    }

    let install = TempDir::new().unwrap();
    let downloader =
        StaticDownloader::new().with("https://mirror.test/1.0.0.zip", zip_with_tool());
    let config = zip_config()
        .source_resolver(Fixed)
        .build_step(PlaceBinary)
        .build()
        .unwrap();

    pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(downloader.requests(), vec!["https://mirror.test/1.0.0.zip"]);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_missing_build_step_rejected_at_construction() {
    let config = PluginConfig::builder("python").build().unwrap();
    let result = Pipeline::new(
        Arc::new(config),
        Arc::new(StaticDownloader::new()),
        Arc::new(RecordingRunner::new()),
    );
    assert!(matches!(
        result,
        Err(Error::NoBuildStepConfigured { plugin }) if plugin == "python"
    ));
}

#[tokio::test]
async fn test_missing_artifact() {
    let install = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config()
        .artifact("bin/tool-helper")
        .build_step(PlaceBinary)
        .build()
        .unwrap();

    let err = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ArtifactMissing { path } if path.ends_with("bin/tool-helper")
    ));
}

#[tokio::test]
async fn test_unsupported_archive_type() {
    let install = TempDir::new().unwrap();
    let url = "https://dl.test/tool.rar";
    let downloader = StaticDownloader::new().with(url, b"rar!".to_vec());
    let config = PluginConfig::builder("tool")
        .download_url(url)
        .archive_type("rar")
        .build_step(PlaceBinary)
        .build()
        .unwrap();

    let err = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedArchiveType { tag } if tag == "rar"));
}

#[tokio::test]
async fn test_download_failure_carries_url() {
    let install = TempDir::new().unwrap();
    let config = zip_config().build_step(PlaceBinary).build().unwrap();

    let err = pipeline(config, &StaticDownloader::new())
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    match err {
        Error::Download { url, source } => {
            assert_eq!(url, ZIP_URL);
            assert!(matches!(*source, Error::Http { status: 404, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_extracted_dir_missing() {
    let install = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config()
        .extracted_dir("{{.Name}}-{{.Version}}")
        .build_step(PlaceBinary)
        .build()
        .unwrap();

    let err = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ExtractedDirMissing { path } if path.ends_with("src/tool-1.0.0")
    ));
}

#[tokio::test]
async fn test_build_failure_names_stage() {
    struct Broken;

    #[async_trait]
    impl BuildHook for Broken {
        async fn build(&self, _ctx: &BuildContext<'_>) -> Result<()> {
            Err(Error::configuration("compiler exploded"))
        }
    }

    let install = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config().build_step(Broken).build().unwrap();

    let err = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Step { stage: "build", .. }));
    assert!(err.to_string().contains("compiler exploded"));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let install = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config().build_step(PlaceBinary).build().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline(config, &downloader)
        .install(&InstallRequest::new("1.0.0", install.path()), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(downloader.requests().is_empty());
}

#[tokio::test]
async fn test_post_install_failure_keeps_build_output() {
    struct Broken;

    #[async_trait]
    impl PostInstallHook for Broken {
        async fn post_install(&self, _ctx: &PostInstallContext<'_>) -> Result<()> {
            Err(Error::configuration("link failed"))
        }
    }

    let install = TempDir::new().unwrap();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config()
        .build_step(PlaceBinary)
        .post_install(Broken)
        .build()
        .unwrap();

    let err = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Step { stage: "post-install", .. }));
    assert!(err.to_string().contains("link failed"));
    assert!(install.path().join("bin/tool").is_file());
}

// =============================================================================
// Download directory handling
// =============================================================================

#[tokio::test]
async fn test_stale_extraction_is_cleared() {
    let install = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();
    std::fs::create_dir_all(downloads.path().join("src")).unwrap();
    std::fs::write(downloads.path().join("src/stale.txt"), "old").unwrap();

    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config().build_step(PlaceBinary).build().unwrap();
    let request = InstallRequest::new("1.0.0", install.path()).with_download_dir(downloads.path());
    pipeline(config, &downloader)
        .install(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!downloads.path().join("src/stale.txt").exists());
    assert!(downloads.path().join("src/tool").is_file());
}

#[tokio::test]
async fn test_temporary_download_dir_removed_after_failure() {
    let install = TempDir::new().unwrap();
    let step = SourceDirLog::failing();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config().build_step(step.clone()).build().unwrap();

    let err = pipeline(config, &downloader)
        .install(
            &InstallRequest::new("1.0.0", install.path()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Step { stage: "build", .. }));

    let source_dir = step.seen();
    assert!(source_dir.ends_with("src"));
    let temp_root = source_dir.parent().unwrap();
    assert!(!temp_root.starts_with(install.path()));
    assert!(!temp_root.exists());
}

#[tokio::test]
async fn test_skip_download_builds_from_download_dir() {
    let install = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();
    std::fs::write(downloads.path().join("tool"), "#!/bin/sh\n").unwrap();

    let step = SourceDirLog::default();
    let downloader = StaticDownloader::new();
    let config = zip_config()
        .skip_download(true)
        .build_step(step.clone())
        .build()
        .unwrap();
    let request = InstallRequest::new("1.0.0", install.path()).with_download_dir(downloads.path());

    let outcome = pipeline(config, &downloader)
        .install(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(step.seen(), downloads.path());
    assert!(downloader.requests().is_empty());
    assert!(!downloads.path().join("src").exists());
}

#[tokio::test]
async fn test_skip_extract_builds_from_download_dir() {
    let install = TempDir::new().unwrap();
    let downloads = TempDir::new().unwrap();

    let step = SourceDirLog::default();
    let downloader = StaticDownloader::new().with(ZIP_URL, zip_with_tool());
    let config = zip_config()
        .skip_extract(true)
        .build_step(step.clone())
        .build()
        .unwrap();
    let request = InstallRequest::new("1.0.0", install.path()).with_download_dir(downloads.path());

    pipeline(config, &downloader)
        .install(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(step.seen(), downloads.path());
    assert_eq!(downloader.requests(), vec![ZIP_URL]);
    assert!(downloads.path().join("tool-1.0.0.zip").is_file());
    assert!(!downloads.path().join("src").exists());
}
