//! `buf`: pre-built release tarballs from GitHub.

use std::sync::Arc;

use tooldeck_core::{Arch, Error, Os, Platform, PluginConfig, Result, VersionListing};
use tooldeck_install::CopyTree;
use tooldeck_versions::{Classifier, SelectPolicy};

use crate::engine::ConfiguredPlugin;
use crate::services::Services;
use crate::sources::GitHubSource;

/// Plugin name.
pub const NAME: &str = "buf";
const OWNER: &str = "bufbuild";
const REPO: &str = "buf";

/// Release asset suffix, e.g. `Linux-x86_64`.
fn asset_platform(platform: Platform) -> Result<&'static str> {
    match (platform.os, platform.arch) {
        (Os::Linux, Arch::X86_64) => Ok("Linux-x86_64"),
        (Os::Linux, Arch::Arm64) => Ok("Linux-aarch64"),
        (Os::Darwin, Arch::X86_64) => Ok("Darwin-x86_64"),
        (Os::Darwin, Arch::Arm64) => Ok("Darwin-arm64"),
        (Os::Windows, _) => Err(Error::configuration(format!(
            "{NAME} publishes no archive for {platform}"
        ))),
    }
}

/// Configuration for `platform`, downloading from `download_base`
/// (`https://github.com` in production).
///
/// # Errors
///
/// Returns a configuration error for platforms without a release archive.
pub fn config(download_base: &str, platform: Platform) -> Result<PluginConfig> {
    let asset = asset_platform(platform)?;
    PluginConfig::builder(NAME)
        .repo(OWNER, REPO)
        .download_url(format!(
            "{}/{{{{.RepoOwner}}}}/{{{{.RepoName}}}}/releases/download/{{{{.VersionPrefix}}}}{{{{.Version}}}}/buf-{asset}.tar.gz",
            download_base.trim_end_matches('/')
        ))
        .archive_type("tar.gz")
        .extracted_dir("buf")
        .listing(VersionListing::Releases)
        .select_policy(SelectPolicy::new(Classifier::default()).fail_on_empty_filter(true))
        .build_step(CopyTree::new())
        .artifact("bin/buf")
        .build()
}

/// The `buf` plugin wired to the shared services.
///
/// # Errors
///
/// See [`config`].
pub fn plugin(services: &Services) -> Result<ConfiguredPlugin> {
    let config = config(&services.settings.github_download_url, services.platform)?;
    let source = GitHubSource::for_config(services.github.clone(), &config);
    ConfiguredPlugin::with_services(config, Arc::new(source), services)
}
