//! Pipeline step vocabulary and stage configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The fixed, ordered steps of a release-test run.
///
/// The pipeline is a strict linear sequence; this enum exists for progress
/// reporting and result attribution, not for transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Provision,
    SelectTests,
    BuildTargets,
    BuildArtifact,
    MaterializeEnv,
    RunTests,
    Interpret,
}

impl PipelineStep {
    /// Get the step name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::Provision => "provision",
            PipelineStep::SelectTests => "select_tests",
            PipelineStep::BuildTargets => "build_targets",
            PipelineStep::BuildArtifact => "build_artifact",
            PipelineStep::MaterializeEnv => "materialize_env",
            PipelineStep::RunTests => "run_tests",
            PipelineStep::Interpret => "interpret",
        }
    }
}

/// Configuration for one external command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Working directory for the command, if not the driver's own.
    pub cwd: Option<PathBuf>,

    /// Timeout in seconds (0 = no timeout; external tools apply their own).
    pub timeout_secs: u64,
}

impl StageConfig {
    /// Create a stage configuration.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            cwd: None,
            timeout_secs: 0,
        }
    }

    /// Run the command from the given directory.
    pub fn in_dir(mut self, dir: PathBuf) -> Self {
        self.cwd = Some(dir);
        self
    }

    /// Apply a timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
