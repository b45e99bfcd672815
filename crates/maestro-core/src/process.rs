//! Subprocess invocation.
//!
//! Three modes over [`tokio::process::Command`]:
//! - *captured*: run to completion, collect stdout/stderr — for read-only
//!   invocations where console noise is undesirable.
//! - *streamed*: forward stdout to the console line by line while
//!   accumulating it for downstream parsing — for interactive provisioning
//!   runs where operators want live progress.
//! - *inherited*: hand the terminal to the child outright.
//!
//! Environment maps are applied as an overlay on top of the inherited process
//! environment, never replacing it, so ambient variables stay visible to the
//! child.

use crate::error::{CoreError, Result};
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Output of a completed captured or streamed invocation.
#[derive(Debug)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl CapturedOutput {
    /// Exit code, `-1` if the child was killed by a signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Run a command to completion, capturing stdout and stderr.
pub async fn run_captured<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    env: &[(String, String)],
) -> Result<CapturedOutput> {
    let program = program.as_ref();
    debug!(program = %program.to_string_lossy(), "Running command (captured)");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd
        .output()
        .await
        .map_err(|e| map_spawn_error(e, program))?;

    Ok(CapturedOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status,
    })
}

/// Run a command with stdout tee'd to the console while being captured.
///
/// Stderr is inherited so errors surface live.
pub async fn run_streamed<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    env: &[(String, String)],
) -> Result<CapturedOutput> {
    let program = program.as_ref();
    debug!(program = %program.to_string_lossy(), "Running command (streamed)");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|e| map_spawn_error(e, program))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout was not piped"))?;

    let mut lines = BufReader::new(stdout).lines();
    let mut captured = String::new();
    while let Some(line) = lines.next_line().await? {
        println!("{line}");
        captured.push_str(&line);
        captured.push('\n');
    }

    let status = child.wait().await?;
    Ok(CapturedOutput {
        stdout: captured,
        stderr: String::new(),
        status,
    })
}

/// Run a command with fully inherited stdio and return its exit status.
pub async fn run_inherited<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    env: &[(String, String)],
) -> Result<ExitStatus> {
    let program = program.as_ref();
    debug!(program = %program.to_string_lossy(), "Running command (inherited stdio)");

    let status = Command::new(program)
        .args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .status()
        .await
        .map_err(|e| map_spawn_error(e, program))?;

    Ok(status)
}

/// Require that every listed executable exists in PATH.
pub async fn require_commands(commands: &[&str]) -> Result<()> {
    for command in commands {
        let which = Command::new("which").arg(command).output().await?;
        if !which.status.success() {
            return Err(CoreError::CommandNotFound(command.to_string()));
        }
    }
    Ok(())
}

fn map_spawn_error(error: std::io::Error, program: &OsStr) -> CoreError {
    if error.kind() == std::io::ErrorKind::NotFound {
        CoreError::CommandNotFound(program.to_string_lossy().into_owned())
    } else {
        CoreError::Io(error)
    }
}
