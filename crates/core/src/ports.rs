//! Collaborator interfaces injected into plugins and the install pipeline.
//!
//! The engine never reaches for the network, an archive codec, or a
//! subprocess directly. Each is a trait object handed over at construction,
//! which is also how tests substitute fakes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Fetches a URL to a file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Write the full response body for `url` to `dest`, replacing any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Non-success statuses and transport failures are errors, as is
    /// cancellation through `cancel`.
    async fn download(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<()>;
}

/// Archive formats the engine can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// gzip-compressed tarball.
    TarGz,
    /// xz-compressed tarball.
    TarXz,
    /// zip archive.
    Zip,
}

impl ArchiveKind {
    /// Canonical tag used in configuration.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }
}

impl FromStr for ArchiveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tar.gz" | "tgz" | "targz" => Ok(Self::TarGz),
            "tar.xz" | "txz" | "tarxz" => Ok(Self::TarXz),
            "zip" => Ok(Self::Zip),
            _ => Err(Error::UnsupportedArchiveType { tag: s.to_string() }),
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Unpacks one archive format.
pub trait Extractor: Send + Sync {
    /// Unpack `archive` into `dest`, creating it if absent and keeping the
    /// archive's relative paths.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable or corrupt archives, or entries that
    /// would land outside `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// A command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Create a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The command line as a single display string.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Runs external processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// # Errors
    ///
    /// A non-zero exit is [`Error::Command`]; cancellation kills the child
    /// and returns [`Error::Cancelled`].
    async fn run(&self, command: &CommandSpec, cancel: &CancellationToken)
    -> Result<CommandOutput>;
}

/// Computes a download URL when a static template is not enough.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// The URL to download for `version`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; typically a failed index lookup.
    async fn resolve(&self, version: &str, cancel: &CancellationToken) -> Result<String>;
}

/// Inputs to a pre-build hook.
pub struct PreBuildContext<'a> {
    /// Version being installed.
    pub version: &'a str,
    /// Extracted source directory.
    pub source_dir: &'a Path,
    /// Process runner to use for any commands.
    pub runner: &'a dyn CommandRunner,
    /// Cancellation for the whole install.
    pub cancel: &'a CancellationToken,
}

/// Inputs to a build step.
pub struct BuildContext<'a> {
    /// Version being installed.
    pub version: &'a str,
    /// Extracted source directory.
    pub source_dir: &'a Path,
    /// Final install directory.
    pub install_dir: &'a Path,
    /// Process runner to use for any commands.
    pub runner: &'a dyn CommandRunner,
    /// Cancellation for the whole install.
    pub cancel: &'a CancellationToken,
}

/// Inputs to a post-install hook.
pub struct PostInstallContext<'a> {
    /// Version being installed.
    pub version: &'a str,
    /// Final install directory.
    pub install_dir: &'a Path,
    /// Process runner to use for any commands.
    pub runner: &'a dyn CommandRunner,
    /// Cancellation for the whole install.
    pub cancel: &'a CancellationToken,
}

/// Runs before the build, e.g. to patch sources.
#[async_trait]
pub trait PreBuildHook: Send + Sync {
    /// Prepare the source tree.
    ///
    /// # Errors
    ///
    /// Any error aborts the install.
    async fn pre_build(&self, ctx: &PreBuildContext<'_>) -> Result<()>;
}

/// Turns the source tree into an installation.
#[async_trait]
pub trait BuildHook: Send + Sync {
    /// Build and place the tool under `ctx.install_dir`.
    ///
    /// # Errors
    ///
    /// Any error aborts the install.
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()>;
}

/// Runs after a successful build.
#[async_trait]
pub trait PostInstallHook: Send + Sync {
    /// Finalize the installation.
    ///
    /// # Errors
    ///
    /// Any error aborts the install; the built files are left in place.
    async fn post_install(&self, ctx: &PostInstallContext<'_>) -> Result<()>;
}
