//! Py-Env-Manager: Python environment layer for relgate
//!
//! Creates and tears down the isolated environments a release-test run
//! needs: throwaway virtualenvs for builds, the `testenv` the built artifact
//! is installed into, and conda env equivalents for the conda path.
//!
//! Focus: deterministic environment layout and single-shot dependency
//! installation.

pub mod conda;
pub mod error;
pub mod interpreter;
pub mod venv;

pub use conda::CondaEnv;
pub use error::{PyEnvError, Result};
pub use interpreter::{find_interpreter, REQUIRED_PYTHON_VERSION};
pub use venv::VirtualEnv;

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Run a command to completion, mapping non-zero exit to `CommandFailed`.
///
/// Stdout is discarded on success; the stderr tail is carried in the error
/// so installation failures surface a usable message.
pub(crate) async fn run_checked(
    program: &Path,
    args: &[String],
    context: &str,
) -> Result<String> {
    debug!(program = %program.display(), ?args, context, "Running environment command");

    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(PyEnvError::CommandFailed {
            context: context.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: stderr_tail(&output.stderr),
        })
    }
}

/// Last few lines of captured stderr, enough to diagnose a failed install.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}
