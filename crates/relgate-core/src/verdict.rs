//! Exit-code interpretation for the test-run step.

use crate::config::Mode;
use serde::{Deserialize, Serialize};

/// pytest's exit code when no tests were collected.
pub const EXIT_NO_TESTS_COLLECTED: i32 = 5;

/// Map the test runner's exit code to the pipeline's final exit code.
///
/// Under merge_gate mode "no tests collected" counts as success: upstream
/// exclusion may legitimately remove every test from a gating run. Every
/// other (mode, code) combination passes through unchanged.
pub fn final_exit_code(mode: Mode, raw: i32) -> i32 {
    match (mode, raw) {
        (Mode::MergeGate, EXIT_NO_TESTS_COLLECTED) => 0,
        (_, code) => code,
    }
}

/// Interpreted outcome of the test-run step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunVerdict {
    /// Exit code reported by the test runner.
    pub raw_exit_code: i32,

    /// Exit code after applying the mode-specific policy.
    pub final_exit_code: i32,

    /// Whether the run counts as passed.
    pub passed: bool,

    /// Summary message.
    pub message: String,
}

impl RunVerdict {
    /// Interpret a raw runner exit code under a run mode.
    pub fn interpret(mode: Mode, raw: i32) -> Self {
        let final_code = final_exit_code(mode, raw);
        let passed = final_code == 0;
        let message = if passed && raw == EXIT_NO_TESTS_COLLECTED {
            format!("No tests collected; treated as success under {mode}")
        } else if passed {
            "Test run passed".to_string()
        } else {
            format!("Test run failed with exit code {raw}")
        };

        RunVerdict {
            raw_exit_code: raw,
            final_exit_code: final_code,
            passed,
            message,
        }
    }
}
