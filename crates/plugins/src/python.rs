//! `python`: CPython built from source tarballs.
//!
//! Versions come from the python.org FTP-style directory index. CPython
//! marks prereleases as `3.13.0a1`, `3.13.0b2` or `3.13.0rc1`, so the shared
//! classifier is extended with the short-letter rule.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use tooldeck_core::{
    CommandSpec, Error, PluginConfig, PostInstallContext, PostInstallHook, Result,
};
use tooldeck_install::RunCommands;
use tooldeck_versions::{Classifier, SelectPolicy, short_letter_marker};

use crate::engine::ConfiguredPlugin;
use crate::services::Services;
use crate::sources::HtmlIndexSource;

/// Plugin name.
pub const NAME: &str = "python";
/// python.org source release index.
pub const DEFAULT_INDEX_URL: &str = "https://www.python.org/ftp/python/";
const VERSION_DIR_PATTERN: &str = r"^(\d+\.\d+(?:\.\d+)?(?:(?:a|b|rc)\d+)?)/?$";

/// Links `bin/python` to `bin/python3` when the build only installed the latter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkUnversionedPython;

#[async_trait]
impl PostInstallHook for LinkUnversionedPython {
    async fn post_install(&self, ctx: &PostInstallContext<'_>) -> Result<()> {
        let bin = ctx.install_dir.join("bin");
        let link = bin.join("python");
        if tokio::fs::symlink_metadata(&link).await.is_ok() {
            return Ok(());
        }
        if !tokio::fs::try_exists(bin.join("python3")).await.unwrap_or(false) {
            return Ok(());
        }
        link_python3(&link).await?;
        debug!(version = ctx.version, link = %link.display(), "Linked python to python3");
        Ok(())
    }
}

#[cfg(unix)]
async fn link_python3(link: &std::path::Path) -> Result<()> {
    tokio::fs::symlink("python3", link)
        .await
        .map_err(|e| Error::io(e, Some(link.to_path_buf()), "link python"))
}

#[cfg(not(unix))]
async fn link_python3(_link: &std::path::Path) -> Result<()> {
    Ok(())
}

fn classifier() -> Classifier {
    Classifier::default().with_rule(short_letter_marker)
}

/// Configuration fetching sources from `index_url`.
///
/// # Errors
///
/// Propagates builder validation errors.
pub fn config(index_url: &str) -> Result<PluginConfig> {
    let build = RunCommands::new()
        .command(CommandSpec::new("./configure").arg("--prefix={prefix}"))
        .command(CommandSpec::new("make").arg("-j{jobs}"))
        .command(CommandSpec::new("make").arg("install"));

    PluginConfig::builder(NAME)
        .repo("python", "cpython")
        .version_prefix("")
        .source_url(format!(
            "{}/{{{{.Version}}}}/Python-{{{{.Version}}}}.tgz",
            index_url.trim_end_matches('/')
        ))
        .archive_type("tgz")
        .extracted_dir("Python-{{.Version}}")
        .select_policy(SelectPolicy::new(classifier()).fail_on_empty_filter(false))
        .build_step(build)
        .post_install(LinkUnversionedPython)
        .create_bin_dir(true)
        .artifact("bin/python3")
        .legacy_filename(".python-version")
        .build()
}

/// The `python` plugin reading versions from `index_url`.
///
/// # Errors
///
/// See [`config`].
pub fn plugin(services: &Services, index_url: &str) -> Result<ConfiguredPlugin> {
    let source = HtmlIndexSource::new(services.http.clone(), index_url, VERSION_DIR_PATTERN)?;
    ConfiguredPlugin::with_services(config(index_url)?, Arc::new(source), services)
}
