//! Per-tool plugin configuration.
//!
//! A [`PluginConfig`] is built once per plugin through [`PluginConfigBuilder`],
//! which fills in defaults, and is then shared read-only (usually behind an
//! `Arc`) by every install of that tool.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use tooldeck_versions::{ChannelAliases, SelectPolicy};

use crate::ports::{
    ArchiveKind, BuildHook, Downloader, PostInstallHook, PreBuildHook, SourceResolver,
};
use crate::template::{TemplateFields, render};
use crate::{Error, Result};

/// Default version prefix stripped from tags.
pub const DEFAULT_VERSION_PREFIX: &str = "v";
/// Default name of the executables directory.
pub const DEFAULT_BIN_DIR: &str = "bin";
/// Cached archives at or below this size are downloaded again.
pub const DEFAULT_MIN_ARCHIVE_SIZE: u64 = 1024;

/// Where a plugin's version list comes from on GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionListing {
    /// Published releases.
    #[default]
    Releases,
    /// Git tags.
    Tags,
}

/// Optional build hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Runs after extraction, before the build.
    pub pre_build: Option<Arc<dyn PreBuildHook>>,
    /// Produces the installation. Required by the install pipeline.
    pub build: Option<Arc<dyn BuildHook>>,
    /// Runs after the build.
    pub post_install: Option<Arc<dyn PostInstallHook>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_build", &self.pre_build.is_some())
            .field("build", &self.build.is_some())
            .field("post_install", &self.post_install.is_some())
            .finish()
    }
}

/// Static description of one tool.
#[derive(Clone)]
pub struct PluginConfig {
    /// Tool name.
    pub name: String,
    /// Repository owner (GitHub organization or user).
    pub repo_owner: String,
    /// Repository name.
    pub repo_name: String,
    /// Template for pre-built binary downloads.
    pub download_url: Option<String>,
    /// Template for source downloads; preferred over `download_url`.
    pub source_url: Option<String>,
    /// Template for the local archive file name.
    pub archive_name: String,
    /// Template for the directory the archive unpacks into.
    pub extracted_dir: Option<String>,
    /// Archive type tag (`tar.gz`, `tar.xz`, `zip`).
    pub archive_type: String,
    /// Prefix stripped from listed versions and available as `{{.VersionPrefix}}`.
    pub version_prefix: String,
    /// Executables directory, relative to the install directory.
    pub bin_dir: String,
    /// Cached archives must be larger than this to skip the download.
    pub min_archive_size: u64,
    /// Paths, relative to the install directory, that a finished install has.
    pub expected_artifacts: Vec<String>,
    /// Static environment for running the tool; `{install_dir}` is expanded.
    pub exec_env: BTreeMap<String, String>,
    /// Version files from other managers this plugin understands.
    pub legacy_filenames: Vec<String>,
    /// Build hooks.
    pub hooks: Hooks,
    /// Computes the download URL instead of a template.
    pub source_resolver: Option<Arc<dyn SourceResolver>>,
    /// Replaces the engine's downloader for this plugin.
    pub downloader: Option<Arc<dyn Downloader>>,
    /// Create `<install_dir>/<bin_dir>` before building.
    pub create_bin_dir: bool,
    /// The build fetches its own sources.
    pub skip_download: bool,
    /// The downloaded file is used as is.
    pub skip_extract: bool,
    /// Use the first directory found after extraction as the source dir.
    pub auto_detect_extracted_dir: bool,
    /// Tags or releases.
    pub listing: VersionListing,
    /// Latest-version selection policy.
    pub select: SelectPolicy,
    /// Channel aliases accepted by `latest_stable`, if the tool has channels.
    pub channel_aliases: Option<ChannelAliases>,
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("name", &self.name)
            .field("repo", &format_args!("{}/{}", self.repo_owner, self.repo_name))
            .field("archive_type", &self.archive_type)
            .field("version_prefix", &self.version_prefix)
            .field("bin_dir", &self.bin_dir)
            .field("expected_artifacts", &self.expected_artifacts)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl PluginConfig {
    /// Start building a configuration for `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PluginConfigBuilder {
        PluginConfigBuilder::new(name)
    }

    /// Template fields for `version`.
    #[must_use]
    pub fn fields<'a>(&'a self, version: &'a str) -> TemplateFields<'a> {
        TemplateFields {
            repo_owner: &self.repo_owner,
            repo_name: &self.repo_name,
            name: &self.name,
            version,
            version_prefix: &self.version_prefix,
        }
    }

    /// Render a template for `version`.
    #[must_use]
    pub fn render(&self, template: &str, version: &str) -> String {
        render(template, &self.fields(version))
    }

    /// Local archive file name for `version`.
    #[must_use]
    pub fn archive_file_name(&self, version: &str) -> String {
        self.render(&self.archive_name, version)
    }

    /// The static download URL for `version`, if a template is configured.
    #[must_use]
    pub fn static_source_url(&self, version: &str) -> Option<String> {
        self.source_url
            .as_deref()
            .or(self.download_url.as_deref())
            .map(|tpl| self.render(tpl, version))
    }

    /// Whether `artifact` lives in the executables directory.
    #[must_use]
    pub fn is_bin_artifact(&self, artifact: &str) -> bool {
        let artifact: std::path::PathBuf = Path::new(artifact)
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        artifact.starts_with(&self.bin_dir)
    }

    /// Strip the configured prefix from a listed tag.
    #[must_use]
    pub fn strip_prefix<'a>(&self, tag: &'a str) -> &'a str {
        if self.version_prefix.is_empty() {
            return tag;
        }
        tag.strip_prefix(self.version_prefix.as_str()).unwrap_or(tag)
    }

    /// Fail unless a build step is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBuildStepConfigured`].
    pub fn require_build_step(&self) -> Result<()> {
        if self.hooks.build.is_none() {
            return Err(Error::NoBuildStepConfigured {
                plugin: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// `bin_dir` as plain relative components joined by `/`.
fn normalize_bin_dir(bin_dir: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in Path::new(bin_dir).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::configuration(format!(
                    "bin directory '{bin_dir}' must be relative to the install directory"
                )));
            }
        }
    }
    if parts.is_empty() {
        return Err(Error::configuration("bin directory must not be empty"));
    }
    Ok(parts.join("/"))
}

/// Builder for [`PluginConfig`].
#[derive(Debug)]
pub struct PluginConfigBuilder {
    config: PluginConfig,
    archive_name_set: bool,
}

impl PluginConfigBuilder {
    fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            config: PluginConfig {
                repo_owner: String::new(),
                repo_name: name.clone(),
                name,
                download_url: None,
                source_url: None,
                archive_name: String::new(),
                extracted_dir: None,
                archive_type: ArchiveKind::TarGz.tag().to_string(),
                version_prefix: DEFAULT_VERSION_PREFIX.to_string(),
                bin_dir: DEFAULT_BIN_DIR.to_string(),
                min_archive_size: DEFAULT_MIN_ARCHIVE_SIZE,
                expected_artifacts: Vec::new(),
                exec_env: BTreeMap::new(),
                legacy_filenames: Vec::new(),
                hooks: Hooks::default(),
                source_resolver: None,
                downloader: None,
                create_bin_dir: false,
                skip_download: false,
                skip_extract: false,
                auto_detect_extracted_dir: false,
                listing: VersionListing::default(),
                select: SelectPolicy::default(),
                channel_aliases: None,
            },
            archive_name_set: false,
        }
    }

    /// Set the repository as `owner/name`.
    #[must_use]
    pub fn repo(mut self, owner: impl Into<String>, name: impl Into<String>) -> Self {
        self.config.repo_owner = owner.into();
        self.config.repo_name = name.into();
        self
    }

    /// Set the binary download URL template.
    #[must_use]
    pub fn download_url(mut self, template: impl Into<String>) -> Self {
        self.config.download_url = Some(template.into());
        self
    }

    /// Set the source download URL template.
    #[must_use]
    pub fn source_url(mut self, template: impl Into<String>) -> Self {
        self.config.source_url = Some(template.into());
        self
    }

    /// Set the local archive name template.
    #[must_use]
    pub fn archive_name(mut self, template: impl Into<String>) -> Self {
        self.config.archive_name = template.into();
        self.archive_name_set = true;
        self
    }

    /// Set the extracted directory name template.
    #[must_use]
    pub fn extracted_dir(mut self, template: impl Into<String>) -> Self {
        self.config.extracted_dir = Some(template.into());
        self
    }

    /// Set the archive type tag.
    #[must_use]
    pub fn archive_type(mut self, tag: impl Into<String>) -> Self {
        self.config.archive_type = tag.into();
        self
    }

    /// Set the version prefix.
    #[must_use]
    pub fn version_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.version_prefix = prefix.into();
        self
    }

    /// Set the executables directory name.
    #[must_use]
    pub fn bin_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.bin_dir = dir.into();
        self
    }

    /// Set the minimum size of a reusable cached archive.
    #[must_use]
    pub fn min_archive_size(mut self, bytes: u64) -> Self {
        self.config.min_archive_size = bytes;
        self
    }

    /// Add an expected artifact path.
    #[must_use]
    pub fn artifact(mut self, path: impl Into<String>) -> Self {
        self.config.expected_artifacts.push(path.into());
        self
    }

    /// Add a static environment variable for running the tool.
    #[must_use]
    pub fn exec_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.exec_env.insert(key.into(), value.into());
        self
    }

    /// Add a legacy version file name.
    #[must_use]
    pub fn legacy_filename(mut self, name: impl Into<String>) -> Self {
        self.config.legacy_filenames.push(name.into());
        self
    }

    /// Set the pre-build hook.
    #[must_use]
    pub fn pre_build(mut self, hook: impl PreBuildHook + 'static) -> Self {
        self.config.hooks.pre_build = Some(Arc::new(hook));
        self
    }

    /// Set the build step.
    #[must_use]
    pub fn build_step(mut self, hook: impl BuildHook + 'static) -> Self {
        self.config.hooks.build = Some(Arc::new(hook));
        self
    }

    /// Set the post-install hook.
    #[must_use]
    pub fn post_install(mut self, hook: impl PostInstallHook + 'static) -> Self {
        self.config.hooks.post_install = Some(Arc::new(hook));
        self
    }

    /// Set a custom source URL resolver.
    #[must_use]
    pub fn source_resolver(mut self, resolver: impl SourceResolver + 'static) -> Self {
        self.config.source_resolver = Some(Arc::new(resolver));
        self
    }

    /// Set a custom downloader for this plugin.
    #[must_use]
    pub fn downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.config.downloader = Some(downloader);
        self
    }

    /// Create the bin directory before building.
    #[must_use]
    pub fn create_bin_dir(mut self, create: bool) -> Self {
        self.config.create_bin_dir = create;
        self
    }

    /// Skip the download stage.
    #[must_use]
    pub fn skip_download(mut self, skip: bool) -> Self {
        self.config.skip_download = skip;
        self
    }

    /// Skip the extraction stage.
    #[must_use]
    pub fn skip_extract(mut self, skip: bool) -> Self {
        self.config.skip_extract = skip;
        self
    }

    /// Detect the extracted directory instead of using the template.
    #[must_use]
    pub fn auto_detect_extracted_dir(mut self, detect: bool) -> Self {
        self.config.auto_detect_extracted_dir = detect;
        self
    }

    /// Choose tags or releases as the version listing.
    #[must_use]
    pub fn listing(mut self, listing: VersionListing) -> Self {
        self.config.listing = listing;
        self
    }

    /// Set the latest-version selection policy.
    #[must_use]
    pub fn select_policy(mut self, policy: SelectPolicy) -> Self {
        self.config.select = policy;
        self
    }

    /// Accept channel aliases in `latest_stable`.
    #[must_use]
    pub fn channel_aliases(mut self, aliases: ChannelAliases) -> Self {
        self.config.channel_aliases = Some(aliases);
        self
    }

    /// Finish the configuration, filling defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty name, an empty bin
    /// directory, or a bin directory or artifact path that is absolute or
    /// escapes the install directory.
    pub fn build(mut self) -> Result<PluginConfig> {
        if self.config.name.trim().is_empty() {
            return Err(Error::configuration("plugin name must not be empty"));
        }

        if !self.archive_name_set {
            let ext = self
                .config
                .archive_type
                .parse::<ArchiveKind>()
                .map_or_else(|_| self.config.archive_type.clone(), |k| k.tag().to_string());
            self.config.archive_name = format!("{{{{.Name}}}}-{{{{.Version}}}}.{ext}");
        }

        self.config.bin_dir = normalize_bin_dir(&self.config.bin_dir)?;

        for artifact in &self.config.expected_artifacts {
            let path = Path::new(artifact);
            if path.is_absolute()
                || path
                    .components()
                    .any(|c| matches!(c, Component::ParentDir))
            {
                return Err(Error::configuration(format!(
                    "artifact path '{artifact}' must be relative to the install directory"
                )));
            }
        }

        Ok(self.config)
    }
}
