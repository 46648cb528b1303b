//! Mode-dependent test selection: exclusion mode and Bazel build targets.

use crate::config::Mode;
use serde::{Deserialize, Serialize};

/// Bazel target pattern covering the whole integration test tree.
pub const INTEG_TEST_TREE: &str = "//tests/integ/...";

/// Build tag filter that drops the autogenerated test targets.
pub const SKIP_AUTOGEN_FILTER: &str = "-autogen";

/// Keyword passed to the external exclusion-resolution script.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionMode {
    /// Exclude only tests currently marked unused.
    Unused,

    /// Exclude every test the resolver knows about for gating runs.
    All,
}

impl ExclusionMode {
    /// Exclusion keyword for a run mode: `all` for merge gating, `unused`
    /// for continuous and release runs.
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::MergeGate => ExclusionMode::All,
            Mode::ContinuousRun | Mode::Release => ExclusionMode::Unused,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionMode::Unused => "unused",
            ExclusionMode::All => "all",
        }
    }
}

/// The Bazel target set built for a run.
///
/// A two-way branch, not a rule engine: release mode builds the full
/// integration tree, every other mode builds the subset tagged to exclude
/// autogenerated tests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildTargetSet {
    /// Target pattern handed to `bazel build`.
    pub pattern: String,

    /// Optional `--build_tag_filters` value.
    pub tag_filters: Option<String>,
}

impl BuildTargetSet {
    /// Select the target set for a run mode.
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Release => Self {
                pattern: INTEG_TEST_TREE.to_string(),
                tag_filters: None,
            },
            Mode::MergeGate | Mode::ContinuousRun => Self {
                pattern: INTEG_TEST_TREE.to_string(),
                tag_filters: Some(SKIP_AUTOGEN_FILTER.to_string()),
            },
        }
    }

    /// Arguments for the `bazel build` invocation of this target set.
    pub fn bazel_args(&self) -> Vec<String> {
        let mut args = vec!["build".to_string()];
        if let Some(filters) = &self.tag_filters {
            args.push(format!("--build_tag_filters={filters}"));
        }
        args.push(self.pattern.clone());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_mode_per_run_mode() {
        assert_eq!(ExclusionMode::for_mode(Mode::MergeGate), ExclusionMode::All);
        assert_eq!(
            ExclusionMode::for_mode(Mode::ContinuousRun),
            ExclusionMode::Unused
        );
        assert_eq!(ExclusionMode::for_mode(Mode::Release), ExclusionMode::Unused);
    }

    #[test]
    fn test_release_builds_full_tree() {
        let targets = BuildTargetSet::for_mode(Mode::Release);
        assert_eq!(targets.pattern, INTEG_TEST_TREE);
        assert!(targets.tag_filters.is_none());
    }

    #[test]
    fn test_non_release_skips_autogen() {
        for mode in [Mode::MergeGate, Mode::ContinuousRun] {
            let targets = BuildTargetSet::for_mode(mode);
            assert_eq!(targets.pattern, INTEG_TEST_TREE);
            assert_eq!(targets.tag_filters.as_deref(), Some(SKIP_AUTOGEN_FILTER));
        }
    }

    #[test]
    fn test_bazel_args_shape() {
        let args = BuildTargetSet::for_mode(Mode::MergeGate).bazel_args();
        assert_eq!(
            args,
            vec![
                "build".to_string(),
                "--build_tag_filters=-autogen".to_string(),
                INTEG_TEST_TREE.to_string(),
            ]
        );

        let args = BuildTargetSet::for_mode(Mode::Release).bazel_args();
        assert_eq!(args, vec!["build".to_string(), INTEG_TEST_TREE.to_string()]);
    }
}
