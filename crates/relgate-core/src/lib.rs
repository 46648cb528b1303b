//! relgate-core - Domain model for the release-test pipeline
//!
//! Process-scoped configuration and the pure decision logic of a run:
//! - `RunConfig`: immutable run configuration (workspace, toolchain, mode)
//! - `Platform`: host OS/architecture detection and tool asset mapping
//! - Build-target and exclusion-mode selection per run mode
//! - Exit-code interpretation (the merge-gate "no tests collected" rule)
//! - Package version extraction from the version declaration file

pub mod config;
pub mod error;
pub mod platform;
pub mod select;
pub mod telemetry;
pub mod verdict;
pub mod version;

pub use config::{EnvKind, Mode, RunConfig};
pub use error::{CoreError, Result};
pub use platform::{HostArch, HostOs, Platform};
pub use select::{BuildTargetSet, ExclusionMode};
pub use telemetry::init_tracing;
pub use verdict::{final_exit_code, RunVerdict, EXIT_NO_TESTS_COLLECTED};
pub use version::extract_version;
