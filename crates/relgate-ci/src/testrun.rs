//! Test runner invocation.
//!
//! pytest runs with strict marker checking, deterministic import mode and
//! parallelism pegged to the logical core count. The pip path additionally
//! filters out tests marked incompatible with the packaged distribution.

use crate::runner::{CommandRunner, StageResult};
use crate::stage::StageConfig;
use relgate_core::EnvKind;
use std::path::Path;
use tracing::info;

/// Marker expression applied on the pip path only.
pub const PIP_MARKER_FILTER: &str = "not pip_incompatible";

/// Marker filter for an environment kind, if any.
pub fn marker_filter(env: EnvKind) -> Option<&'static str> {
    match env {
        EnvKind::Pip => Some(PIP_MARKER_FILTER),
        EnvKind::Conda => None,
    }
}

/// Logical core count for the `-n` parallelism flag.
fn logical_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Build the pytest stage for the staged test directory.
pub fn pytest_stage(python: &Path, staged_tests: &Path, env: EnvKind) -> StageConfig {
    let mut command = vec![
        python.display().to_string(),
        "-m".to_string(),
        "pytest".to_string(),
        "--strict-markers".to_string(),
        "--import-mode=append".to_string(),
        "-n".to_string(),
        logical_cores().to_string(),
    ];
    if let Some(filter) = marker_filter(env) {
        command.push("-m".to_string());
        command.push(filter.to_string());
    }
    command.push(staged_tests.display().to_string());

    StageConfig::new("pytest", command)
}

/// Run the test stage, capturing the exit code instead of failing on it.
///
/// Only spawn-level problems are errors here; a non-zero pytest exit is a
/// result the caller interprets per run mode.
pub async fn run_tests(stage: &StageConfig) -> anyhow::Result<StageResult> {
    info!(command = ?stage.command, "Running integration tests");
    let result = CommandRunner::execute(stage).await?;
    info!(
        exit_code = result.exit_code,
        duration_ms = result.duration_ms,
        "Test run finished"
    );
    Ok(result)
}
