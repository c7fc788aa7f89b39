//! Fake collaborators for pipeline and plugin tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use tooldeck_core::{
    BuildContext, BuildHook, CommandOutput, CommandRunner, CommandSpec, Downloader, Error, Result,
};

/// Serves fixed bodies by URL and records every request.
#[derive(Debug, Default, Clone)]
pub struct StaticDownloader {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticDownloader {
    /// A downloader serving nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.lock().insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Downloader for StaticDownloader {
    async fn download(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<()> {
        self.requests.lock().push(url.to_string());
        if cancel.is_cancelled() {
            return Err(Error::cancelled("download"));
        }
        let body = self.bodies.lock().get(url).cloned();
        let Some(body) = body else {
            return Err(Error::Http {
                url: url.to_string(),
                status: 404,
            });
        };
        tokio::fs::write(dest, body)
            .await
            .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "write download"))
    }
}

/// Records commands without running them.
#[derive(Debug, Default, Clone)]
pub struct RecordingRunner {
    commands: Arc<Mutex<Vec<CommandSpec>>>,
}

impl RecordingRunner {
    /// A runner with no recorded commands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands run so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!("running `{}`", command.display())));
        }
        self.commands.lock().push(command.clone());
        Ok(CommandOutput::default())
    }
}

/// Build step that writes fixed files into the install directory and counts
/// its invocations.
#[derive(Debug, Default, Clone)]
pub struct WriteFilesStep {
    files: Vec<(String, Vec<u8>)>,
    calls: Arc<Mutex<usize>>,
}

impl WriteFilesStep {
    /// A step writing no files yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `contents` to `relative` under the install directory.
    #[must_use]
    pub fn file(mut self, relative: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((relative.into(), contents.into()));
        self
    }

    /// How many times the step ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl BuildHook for WriteFilesStep {
    async fn build(&self, ctx: &BuildContext<'_>) -> Result<()> {
        *self.calls.lock() += 1;
        for (relative, contents) in &self.files {
            let path = ctx.install_dir.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::io(e, Some(parent.to_path_buf()), "create directory"))?;
            }
            tokio::fs::write(&path, contents)
                .await
                .map_err(|e| Error::io(e, Some(path.clone()), "write file"))?;
        }
        Ok(())
    }
}
