//! Subprocess execution on tokio.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tooldeck_core::{CommandOutput, CommandRunner, CommandSpec, Error, Result};

/// Lines of stderr kept in a [`Error::Command`].
const STDERR_TAIL_LINES: usize = 20;

/// Runs commands with `tokio::process`, killing the child on cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    /// Create a runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput> {
        let command_line = spec.display();
        if cancel.is_cancelled() {
            return Err(Error::cancelled(format!("running `{command_line}`")));
        }
        debug!(command = %command_line, cwd = ?spec.cwd, "Running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd
            .spawn()
            .map_err(|e| Error::io(e, spec.cwd.clone(), format!("spawn `{command_line}`")))?;

        let output = tokio::select! {
            output = child.wait_with_output() => output
                .map_err(|e| Error::io(e, spec.cwd.clone(), format!("wait for `{command_line}`")))?,
            () = cancel.cancelled() => {
                warn!(command = %command_line, "Command cancelled, killing child");
                return Err(Error::cancelled(format!("running `{command_line}`")));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(Error::Command {
                command: command_line,
                status: output.status.to_string(),
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
