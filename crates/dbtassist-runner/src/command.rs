//! Invoking the dbt CLI
//!
//! The runner talks to dbt through [`DbtExecutor`] so tests can script the
//! output of `dbt compile` and `dbt run` without a dbt installation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Errors raised before dbt produced any output
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to start dbt ('{0}'): {1}")]
    Spawn(String, String),

    #[error("dbt did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Failed to access {0}: {1}")]
    IoError(String, String),
}

/// Captured result of one dbt invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: Some(1),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Runs dbt with the given arguments
#[async_trait::async_trait]
pub trait DbtExecutor: Send + Sync {
    /// `args` excludes the binary and `--project-dir`
    async fn invoke(&self, args: &[String]) -> Result<CommandOutput, RunnerError>;
}

/// The real dbt binary, run as a subprocess
#[derive(Debug, Clone)]
pub struct DbtCli {
    binary: String,
    project_dir: PathBuf,
    timeout: Duration,
}

impl DbtCli {
    pub fn new(binary: impl Into<String>, project_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            project_dir: project_dir.into(),
            timeout,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

#[async_trait::async_trait]
impl DbtExecutor for DbtCli {
    async fn invoke(&self, args: &[String]) -> Result<CommandOutput, RunnerError> {
        tracing::debug!(binary = %self.binary, ?args, "invoking dbt");

        let child = Command::new(&self.binary)
            .args(args)
            .arg("--project-dir")
            .arg(&self.project_dir)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::Spawn(self.binary.clone(), e.to_string()))?;

        // Dropping the future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RunnerError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| RunnerError::IoError(self.binary.clone(), e.to_string()))?;

        Ok(CommandOutput {
            success: output.status.success(),
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
