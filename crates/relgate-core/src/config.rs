//! Run configuration and mode/environment selectors.

use crate::error::CoreError;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Run mode controlling test scope and exit-code policy.
///
/// These are mutually exclusive initial configuration values, not transition
/// states: the pipeline itself is a strict linear sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Pre-merge gating run; "no tests collected" counts as success.
    MergeGate,

    /// Scheduled run against the current development head.
    ContinuousRun,

    /// Release qualification run; builds the full integration tree.
    Release,
}

impl Mode {
    /// Get the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::MergeGate => "merge_gate",
            Mode::ContinuousRun => "continuous_run",
            Mode::Release => "release",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge_gate" => Ok(Mode::MergeGate),
            "continuous_run" => Ok(Mode::ContinuousRun),
            "release" => Ok(Mode::Release),
            other => Err(CoreError::InvalidMode(other.to_string())),
        }
    }
}

/// Kind of isolated environment the built artifact is tested in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnvKind {
    /// Bazel-built wheel installed into a virtualenv.
    Pip,

    /// conda-build package resolved into a conda env.
    Conda,
}

impl EnvKind {
    /// Get the environment kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKind::Pip => "pip",
            EnvKind::Conda => "conda",
        }
    }
}

impl fmt::Display for EnvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pip" => Ok(EnvKind::Pip),
            "conda" => Ok(EnvKind::Conda),
            other => Err(CoreError::InvalidEnvKind(other.to_string())),
        }
    }
}

/// Validated configuration for a single pipeline run.
///
/// Immutable after argument parsing. Every stage receives this struct and
/// resolves paths against `workspace`; the process working directory is
/// never changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Workspace root of the package under test.
    pub workspace: PathBuf,

    /// Bazel binary to invoke.
    pub bazel_path: PathBuf,

    /// Environment kind (pip or conda).
    pub env: EnvKind,

    /// Run mode (merge_gate, continuous_run or release).
    pub mode: Mode,

    /// Whether to build and install the companion snowpark package from the
    /// sibling workspace alongside the artifact under test.
    pub with_snowpark: bool,

    /// Detected host platform.
    pub platform: Platform,
}

impl RunConfig {
    /// Create a configuration with default toolchain settings.
    pub fn new(workspace: PathBuf, platform: Platform) -> Self {
        Self {
            workspace,
            bazel_path: PathBuf::from("bazel"),
            env: EnvKind::Pip,
            mode: Mode::ContinuousRun,
            with_snowpark: false,
            platform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HostArch, HostOs};

    #[test]
    fn test_mode_round_trip() {
        for mode in [Mode::MergeGate, Mode::ContinuousRun, Mode::Release] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_rejects_unknown() {
        let err = "nightly".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("nightly"));
    }

    #[test]
    fn test_env_kind_round_trip() {
        assert_eq!("pip".parse::<EnvKind>().unwrap(), EnvKind::Pip);
        assert_eq!("conda".parse::<EnvKind>().unwrap(), EnvKind::Conda);
        assert!("virtualenv".parse::<EnvKind>().is_err());
    }

    #[test]
    fn test_run_config_defaults() {
        let platform = Platform::new(HostOs::Linux, HostArch::Amd64);
        let config = RunConfig::new(PathBuf::from("/ws"), platform);
        assert_eq!(config.bazel_path, PathBuf::from("bazel"));
        assert_eq!(config.env, EnvKind::Pip);
        assert_eq!(config.mode, Mode::ContinuousRun);
        assert!(!config.with_snowpark);
    }
}
