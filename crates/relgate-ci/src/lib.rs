//! relgate CI - release-test pipeline orchestration
//!
//! Provides the pipeline driver that:
//! - Provisions auxiliary tooling (yq, the pinned Python interpreter)
//! - Selects tests and build targets per run mode
//! - Builds the wheel or conda artifact
//! - Materializes an isolated test environment and installs the artifact
//! - Runs the staged integration suite and interprets its exit code

pub mod build;
pub mod error;
pub mod pipeline;
pub mod provision;
pub mod runner;
pub mod stage;
pub mod staging;
pub mod testrun;

// Re-export key types
pub use build::{Artifact, ArtifactBuilder};
pub use error::{CiError, Result};
pub use pipeline::{PipelineResult, ReleasePipeline, RunPlan};
pub use provision::ensure_yq;
pub use runner::{CommandRunner, StageResult};
pub use stage::{PipelineStep, StageConfig};
