//! Reusable build steps.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use tooldeck_core::{BuildContext, BuildHook, CommandSpec, Error, Result};

/// Placeholder for the extracted source directory.
pub const SRC_PLACEHOLDER: &str = "{src}";
/// Placeholder for the install directory.
pub const PREFIX_PLACEHOLDER: &str = "{prefix}";
/// Placeholder for the number of parallel build jobs.
pub const JOBS_PLACEHOLDER: &str = "{jobs}";

/// Places the extracted tree into the install directory as is.
///
/// Used by plugins that ship pre-built binaries.
#[derive(Debug, Clone, Default)]
pub struct CopyTree {
    subdir: Option<PathBuf>,
    target: Option<PathBuf>,
}

impl CopyTree {
    /// Copy the whole source directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy only `subdir` of the source directory.
    #[must_use]
    pub fn subdir(mut self, subdir: impl Into<PathBuf>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    /// Place the tree under `target` inside the install directory.
    #[must_use]
    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }
}

fn copy_recursive(from: &Path, to: &Path) -> Result<u64> {
    std::fs::create_dir_all(to)
        .map_err(|e| Error::io(e, Some(to.to_path_buf()), "create directory"))?;
    let entries =
        std::fs::read_dir(from).map_err(|e| Error::io(e, Some(from.to_path_buf()), "read directory"))?;

    let mut copied = 0;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, Some(from.to_path_buf()), "read directory"))?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io(e, Some(src.clone()), "stat"))?;

        if file_type.is_dir() {
            copied += copy_recursive(&src, &dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(&src, &dest)?;
            copied += 1;
        } else {
            std::fs::copy(&src, &dest).map_err(|e| Error::io(e, Some(dest.clone()), "copy file"))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target =
        std::fs::read_link(src).map_err(|e| Error::io(e, Some(src.to_path_buf()), "read link"))?;
    if dest.symlink_metadata().is_ok() {
        std::fs::remove_file(dest)
            .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "replace link"))?;
    }
    std::os::unix::fs::symlink(&target, dest)
        .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "create link"))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    std::fs::copy(src, dest)
        .map(|_| ())
        .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "copy file"))
}

#[async_trait]
impl BuildHook for CopyTree {
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let from = match &self.subdir {
            Some(sub) => ctx.source_dir.join(sub),
            None => ctx.source_dir.to_path_buf(),
        };
        if !from.is_dir() {
            return Err(Error::ExtractedDirMissing { path: from });
        }
        let to = match &self.target {
            Some(target) => ctx.install_dir.join(target),
            None => ctx.install_dir.to_path_buf(),
        };

        let source = from.clone();
        let copied = tokio::task::spawn_blocking(move || copy_recursive(&from, &to))
            .await
            .map_err(|e| Error::configuration(format!("copy task failed: {e}")))??;
        debug!(source = %source.display(), files = copied, "Copied tree into install dir");
        Ok(())
    }
}

/// Runs a configure/make style command list.
///
/// Program names, arguments and environment values may use `{src}`,
/// `{prefix}` and `{jobs}`. Commands run in the source directory unless
/// they set their own working directory; a relative one is resolved against
/// the source directory.
#[derive(Debug, Clone, Default)]
pub struct RunCommands {
    commands: Vec<CommandSpec>,
}

impl RunCommands {
    /// An empty command list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    #[must_use]
    pub fn command(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }

    /// The configured commands, unexpanded.
    #[must_use]
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Expand placeholders for one build.
    #[must_use]
    pub fn expand(&self, source_dir: &Path, install_dir: &Path) -> Vec<CommandSpec> {
        let src = source_dir.display().to_string();
        let prefix = install_dir.display().to_string();
        let jobs = std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get)
            .to_string();
        let sub = |s: &str| {
            s.replace(SRC_PLACEHOLDER, &src)
                .replace(PREFIX_PLACEHOLDER, &prefix)
                .replace(JOBS_PLACEHOLDER, &jobs)
        };

        self.commands
            .iter()
            .map(|cmd| CommandSpec {
                program: sub(&cmd.program),
                args: cmd.args.iter().map(|a| sub(a)).collect(),
                cwd: Some(match &cmd.cwd {
                    Some(dir) => source_dir.join(sub(&dir.display().to_string())),
                    None => source_dir.to_path_buf(),
                }),
                env: cmd.env.iter().map(|(k, v)| (k.clone(), sub(v))).collect(),
            })
            .collect()
    }
}

#[async_trait]
impl BuildHook for RunCommands {
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        for command in self.expand(ctx.source_dir, ctx.install_dir) {
            info!(version = ctx.version, command = %command.display(), "Build");
            ctx.runner.run(&command, ctx.cancel).await?;
        }
        Ok(())
    }
}
