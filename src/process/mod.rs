//! Subprocess execution.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` in `cwd` with inherited stdio, failing on a non-zero
    /// exit.
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<()>;

    /// Run `program` in `cwd` and return its trimmed stdout.
    async fn output(&self, program: &str, args: &[String], cwd: &Path) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    NonZeroExit {
        command: String,
        /// `None` when the process was killed by a signal.
        code: Option<i32>,
        stderr: String,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::NonZeroExit {
                command,
                code,
                stderr,
            } => {
                match code {
                    Some(code) => write!(f, "`{}` exited with code {}", command, code)?,
                    None => write!(f, "`{}` was terminated by a signal", command)?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ProcessError {}

pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealProcessRunner;

impl RealProcessRunner {
    fn command(program: &str, args: &[String], cwd: &Path) -> Command {
        // npm and pnpm are batch shims on Windows
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(program);
            cmd
        } else {
            Command::new(program)
        };
        cmd.args(args).current_dir(cwd).kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProcessRunner for RealProcessRunner {
    #[tracing::instrument(skip(self))]
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<()> {
        let line = command_line(program, args);
        debug!("Running `{}` in {:?}", line, cwd);

        let status = Self::command(program, args, cwd)
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to start `{}`", line))?;

        if !status.success() {
            return Err(ProcessError::NonZeroExit {
                command: line,
                code: status.code(),
                stderr: String::new(),
            }
            .into());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn output(&self, program: &str, args: &[String], cwd: &Path) -> Result<String> {
        let line = command_line(program, args);
        debug!("Capturing `{}` in {:?}", line, cwd);

        let output = Self::command(program, args, cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to start `{}`", line))?;

        if !output.status.success() {
            return Err(ProcessError::NonZeroExit {
                command: line,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
