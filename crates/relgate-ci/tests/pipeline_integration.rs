//! Integration tests for the release-test pipeline with stub collaborators.
//!
//! External tools (the exclusion script, the test runner) are replaced by
//! shell stubs in temp workspaces; no Bazel, pip or conda is required.

use relgate_ci::pipeline::{ReleasePipeline, RunPlan};
use relgate_ci::staging::{parse_exclusion_file, stage_tests};
use relgate_ci::testrun::run_tests;
use relgate_ci::{CommandRunner, StageConfig};
use relgate_core::{
    final_exit_code, EnvKind, HostArch, HostOs, Mode, Platform, RunConfig, RunVerdict,
    EXIT_NO_TESTS_COLLECTED,
};
use std::path::Path;

fn stub_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("ci")).expect("mkdir ci");
    dir
}

fn write_exclusion_script(workspace: &Path, body: &str) {
    let script = workspace.join("ci/get_excluded_tests.sh");
    std::fs::write(&script, format!("#!/bin/bash\n{body}\n")).expect("write script");
}

fn config_for(workspace: &Path, mode: Mode, env: EnvKind) -> RunConfig {
    let mut config = RunConfig::new(
        workspace.to_path_buf(),
        Platform::new(HostOs::Linux, HostArch::Amd64),
    );
    config.mode = mode;
    config.env = env;
    config
}

/// Test: the exclusion script receives the output path and the mode keyword.
#[tokio::test]
async fn test_exclusion_script_contract() {
    let workspace = stub_workspace();
    // The stub records its mode argument as a comment and emits one path.
    write_exclusion_script(
        workspace.path(),
        "echo \"# mode=$2\" > \"$1\"\necho integ/excluded_test.py >> \"$1\"",
    );

    let config = config_for(workspace.path(), Mode::MergeGate, EnvKind::Pip);
    let plan = RunPlan::for_config(&config);
    let exclusion_file = workspace.path().join("excluded.txt");

    ReleasePipeline::resolve_exclusions(&config, &plan, &exclusion_file)
        .await
        .expect("exclusion resolution failed");

    let raw = std::fs::read_to_string(&exclusion_file).expect("read exclusion file");
    assert!(raw.contains("mode=all"), "merge_gate passes 'all': {raw}");

    let excluded = parse_exclusion_file(&exclusion_file).expect("parse failed");
    assert_eq!(excluded, vec![std::path::PathBuf::from("integ/excluded_test.py")]);
}

/// Test: continuous and release runs resolve exclusions with `unused`.
#[tokio::test]
async fn test_exclusion_keyword_for_non_gating_modes() {
    for mode in [Mode::ContinuousRun, Mode::Release] {
        let workspace = stub_workspace();
        write_exclusion_script(workspace.path(), "echo \"# mode=$2\" > \"$1\"");

        let config = config_for(workspace.path(), mode, EnvKind::Pip);
        let plan = RunPlan::for_config(&config);
        let exclusion_file = workspace.path().join("excluded.txt");

        ReleasePipeline::resolve_exclusions(&config, &plan, &exclusion_file)
            .await
            .expect("exclusion resolution failed");

        let raw = std::fs::read_to_string(&exclusion_file).expect("read exclusion file");
        assert!(raw.contains("mode=unused"), "{mode} passes 'unused': {raw}");
    }
}

/// Test: a failing exclusion script aborts the pipeline step.
#[tokio::test]
async fn test_failing_exclusion_script_aborts() {
    let workspace = stub_workspace();
    write_exclusion_script(workspace.path(), "exit 7");

    let config = config_for(workspace.path(), Mode::ContinuousRun, EnvKind::Pip);
    let plan = RunPlan::for_config(&config);
    let exclusion_file = workspace.path().join("excluded.txt");

    let err = ReleasePipeline::resolve_exclusions(&config, &plan, &exclusion_file)
        .await
        .expect_err("should fail");
    assert!(err.to_string().contains("resolve_exclusions"));
}

/// Test: release mode builds the full integration tree and never remaps
/// the runner's "no tests collected" code, even when the runner reports 5.
#[tokio::test]
async fn test_release_mode_full_tree_without_remap() {
    let workspace = stub_workspace();
    let config = config_for(workspace.path(), Mode::Release, EnvKind::Pip);
    let plan = RunPlan::for_config(&config);

    assert_eq!(plan.targets.pattern, "//tests/integ/...");
    assert!(plan.targets.tag_filters.is_none());

    // Stub runner standing in for pytest, reporting "no tests collected".
    let stage = StageConfig::new(
        "pytest",
        vec!["sh".to_string(), "-c".to_string(), "exit 5".to_string()],
    );
    let result = run_tests(&stage).await.expect("run failed");
    assert_eq!(result.exit_code, EXIT_NO_TESTS_COLLECTED);

    let verdict = RunVerdict::interpret(plan.mode, result.exit_code);
    assert_eq!(verdict.final_exit_code, EXIT_NO_TESTS_COLLECTED);
    assert!(!verdict.passed);
}

/// Test: merge_gate remaps "no tests collected" to success end to end.
#[tokio::test]
async fn test_merge_gate_remaps_empty_run() {
    let stage = StageConfig::new(
        "pytest",
        vec!["sh".to_string(), "-c".to_string(), "exit 5".to_string()],
    );
    let result = run_tests(&stage).await.expect("run failed");

    let verdict = RunVerdict::interpret(Mode::MergeGate, result.exit_code);
    assert_eq!(verdict.final_exit_code, 0);
    assert!(verdict.passed);

    // Genuine failures still propagate under merge_gate.
    assert_eq!(final_exit_code(Mode::MergeGate, 2), 2);
}

/// Test: build-type stages are fail-fast while the test stage is captured.
#[tokio::test]
async fn test_build_stage_fail_fast_vs_test_capture() {
    let failing = StageConfig::new(
        "bazel_build_tests",
        vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()],
    );

    // Fail-fast surface: non-zero exit is an error.
    let err = CommandRunner::execute_checked(&failing).await.expect_err("should bail");
    assert!(err.to_string().contains("bazel_build_tests"));

    // Captured surface: the same exit is a result.
    let result = CommandRunner::execute(&failing).await.expect("capture failed");
    assert_eq!(result.exit_code, 1);
    assert!(!result.passed());
}

/// Test: exclusion resolution feeds the staged copy; excluded tests never
/// reach the staged tree.
#[tokio::test]
async fn test_exclusions_filter_staged_tree() {
    let workspace = stub_workspace();
    write_exclusion_script(
        workspace.path(),
        "echo integ/flaky_test.py > \"$1\"",
    );

    let tests_dir = workspace.path().join("tests");
    for name in ["integ/flaky_test.py", "integ/stable_test.py", "integ/sub/deep_test.py"] {
        let path = tests_dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"# test").unwrap();
    }

    let config = config_for(workspace.path(), Mode::ContinuousRun, EnvKind::Pip);
    let plan = RunPlan::for_config(&config);
    let exclusion_file = workspace.path().join("excluded.txt");
    ReleasePipeline::resolve_exclusions(&config, &plan, &exclusion_file)
        .await
        .expect("exclusion resolution failed");
    let excluded = parse_exclusion_file(&exclusion_file).expect("parse failed");

    let staged = tempfile::tempdir().unwrap();
    let count = stage_tests(&tests_dir, &staged.path().join("tests"), &excluded).unwrap();

    assert_eq!(count, 2);
    assert!(!staged.path().join("tests/integ/flaky_test.py").exists());
    assert!(staged.path().join("tests/integ/stable_test.py").exists());
    assert!(staged.path().join("tests/integ/sub/deep_test.py").exists());
}
