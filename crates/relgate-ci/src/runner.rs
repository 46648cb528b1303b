//! External command execution with captured output.

use crate::stage::StageConfig;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Result of a stage execution.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Runner for the pipeline's external commands.
///
/// Every invocation blocks until the external process finishes. A non-zero
/// exit is reported in the result, not as an error: build-type callers bail
/// on it, the test-run caller interprets it.
pub struct CommandRunner;

impl CommandRunner {
    /// Execute a single stage and return the result.
    pub async fn execute(config: &StageConfig) -> anyhow::Result<StageResult> {
        let start = Instant::now();

        if config.command.is_empty() {
            anyhow::bail!("Stage {} has empty command", config.name);
        }

        let exe = &config.command[0];
        let args = &config.command[1..];

        let mut command = Command::new(exe);
        command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let child = command.spawn().map_err(|e| {
            anyhow::anyhow!("Stage {} failed to spawn '{}': {}", config.name, exe, e)
        })?;

        let output = if config.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Stage {} timed out after {} seconds",
                    config.name,
                    config.timeout_secs
                )
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let success = output.status.success();

        Ok(StageResult {
            stage_name: config.name.clone(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
            success,
        })
    }

    /// Execute a fail-fast stage: any non-zero exit becomes an error.
    pub async fn execute_checked(config: &StageConfig) -> anyhow::Result<StageResult> {
        let result = Self::execute(config).await?;
        if !result.passed() {
            anyhow::bail!(
                "Stage '{}' exited with code {}: {}",
                result.stage_name,
                result.exit_code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }
}
