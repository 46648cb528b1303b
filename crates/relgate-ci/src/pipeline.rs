//! Release-test pipeline orchestration.
//!
//! A strict linear sequence: provision toolchain, select tests, build
//! targets and artifact, materialize the test environment, run the staged
//! suite, interpret the exit code. Only the test-run step captures a
//! non-zero exit; every other step is fail-fast.

use crate::build::{Artifact, ArtifactBuilder, CONDA_RECIPE_DIR, PACKAGE_NAME};
use crate::provision::{ensure_yq, yq_query};
use crate::runner::CommandRunner;
use crate::stage::{PipelineStep, StageConfig};
use crate::staging::{parse_exclusion_file, stage_tests};
use crate::testrun::{pytest_stage, run_tests};
use anyhow::Context;
use py_env_manager::{find_interpreter, CondaEnv, VirtualEnv, REQUIRED_PYTHON_VERSION};
use relgate_core::{
    BuildTargetSet, EnvKind, ExclusionMode, Mode, RunConfig, RunVerdict,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// Exclusion-resolution collaborator, relative to the workspace root.
pub const EXCLUSION_SCRIPT: &str = "ci/get_excluded_tests.sh";

/// Test source tree, relative to the workspace root.
pub const TESTS_DIR: &str = "tests";

/// Integration test subtree inside the staged copy.
pub const INTEG_TESTS_DIR: &str = "tests/integ";

/// Pinned requirements installed next to the artifact on the pip path.
pub const PINNED_REQUIREMENTS_FILE: &str = "requirements.txt";

/// Extras group installed with the artifact.
pub const ARTIFACT_EXTRAS: &str = "all";

/// Remote channel consulted after the local build channel on the conda path.
pub const REMOTE_CHANNEL: &str = "conda-forge";

/// Test-only packages the test environment needs on the conda path.
pub const TEST_REQUIREMENTS: [&str; 2] = ["pytest", "pytest-xdist"];

/// Decisions derived from a run configuration before anything executes.
///
/// ExclusionMode and BuildTargetSet are pure functions of the run mode and
/// are computed exactly once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlan {
    pub mode: Mode,
    pub env: EnvKind,
    pub exclusion_mode: ExclusionMode,
    pub targets: BuildTargetSet,
    pub marker_filter: Option<String>,
}

impl RunPlan {
    /// Derive the plan for a run configuration.
    pub fn for_config(config: &RunConfig) -> Self {
        RunPlan {
            mode: config.mode,
            env: config.env,
            exclusion_mode: ExclusionMode::for_mode(config.mode),
            targets: BuildTargetSet::for_mode(config.mode),
            marker_filter: crate::testrun::marker_filter(config.env).map(str::to_string),
        }
    }
}

/// Result of a complete pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run mode the result was interpreted under.
    pub mode: Mode,

    /// Environment kind the artifact was tested in.
    pub env: EnvKind,

    /// The built artifact.
    pub artifact: Artifact,

    /// Number of test files staged for the run.
    pub staged_tests: usize,

    /// Interpreted test-run outcome.
    pub verdict: RunVerdict,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// The release-test pipeline driver.
pub struct ReleasePipeline;

impl ReleasePipeline {
    /// Execute the pipeline for a validated run configuration.
    ///
    /// Every ephemeral directory (tool downloads, the test environment, the
    /// staged test tree) is owned by this scope, so cleanup happens on all
    /// exit paths.
    pub async fn run(config: &RunConfig) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        let plan = RunPlan::for_config(config);
        info!(
            mode = %config.mode,
            env = %config.env,
            workspace = %config.workspace.display(),
            "Starting release-test pipeline"
        );

        // Toolchain provisioning. The pip path needs the pinned interpreter;
        // the conda path needs yq for recipe metadata.
        info!(step = PipelineStep::Provision.name(), "Provisioning toolchain");
        let tool_dir = TempDir::new()?;
        let interpreter = match config.env {
            EnvKind::Pip => Some(find_interpreter(REQUIRED_PYTHON_VERSION)?),
            EnvKind::Conda => None,
        };
        let yq = match config.env {
            EnvKind::Conda => Some(ensure_yq(&config.platform, tool_dir.path()).await?),
            EnvKind::Pip => None,
        };

        // Test selection: exclusion set and build targets.
        info!(step = PipelineStep::SelectTests.name(), "Selecting tests");
        let exclusion_file = tool_dir.path().join("excluded_tests.txt");
        Self::resolve_exclusions(config, &plan, &exclusion_file).await?;
        let excluded = parse_exclusion_file(&exclusion_file)?;
        info!(
            excluded = excluded.len(),
            exclusion_mode = plan.exclusion_mode.as_str(),
            "Resolved test exclusions"
        );

        // Artifact build.
        let builder = ArtifactBuilder::new(config);
        let version = builder.package_version()?;
        info!(step = PipelineStep::BuildTargets.name(), version = %version, "Building targets");
        builder.build_targets(&plan.targets).await?;
        info!(step = PipelineStep::BuildArtifact.name(), "Building artifact");
        let artifact = match config.env {
            EnvKind::Pip => builder.build_wheel(&version).await?,
            EnvKind::Conda => builder.build_conda_package(&version).await?,
        };
        let companion = if config.with_snowpark {
            Some(builder.build_companion_wheel().await?)
        } else {
            None
        };

        // Test environment.
        info!(
            step = PipelineStep::MaterializeEnv.name(),
            env = %config.env,
            "Materializing test environment"
        );
        let env_root = TempDir::new()?;
        let testenv_dir = env_root.path().join("testenv");
        let python = match config.env {
            EnvKind::Pip => {
                let interpreter = interpreter
                    .as_ref()
                    .context("pip path requires a provisioned interpreter")?;
                let venv = VirtualEnv::create(interpreter, &testenv_dir).await?;
                let specs = pip_install_specs(config, &artifact, companion.as_deref());
                venv.pip_install(&specs).await?;
                debug!(packages = %venv.pip_list().await?, "Test environment contents");
                venv.python()
            }
            EnvKind::Conda => {
                let yq = yq.as_ref().context("conda path requires yq")?;
                let env = CondaEnv::create(&testenv_dir, REQUIRED_PYTHON_VERSION).await?;

                let meta = config.workspace.join(CONDA_RECIPE_DIR).join("meta.yaml");
                let optional = yq_query(yq, ".requirements.run_constrained[]", &meta).await?;
                let channels = vec![
                    format!("file://{}", artifact.path.display()),
                    REMOTE_CHANNEL.to_string(),
                ];
                let specs = conda_install_specs(&artifact.version, &optional);
                env.install(&channels, &specs).await?;

                if let Some(wheel) = &companion {
                    Self::install_companion(&env, wheel).await?;
                }
                env.python()
            }
        };

        // Stage and run the filtered test tree.
        info!(step = PipelineStep::RunTests.name(), "Staging and running tests");
        let staged = TempDir::new()?;
        let staged_tests = stage_tests(
            &config.workspace.join(TESTS_DIR),
            &staged.path().join(TESTS_DIR),
            &excluded,
        )?;
        let stage = pytest_stage(&python, &staged.path().join(INTEG_TESTS_DIR), config.env);
        let result = run_tests(&stage).await?;

        // Interpret the runner's exit code under the run mode.
        let verdict = RunVerdict::interpret(config.mode, result.exit_code);
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            step = PipelineStep::Interpret.name(),
            raw_exit_code = verdict.raw_exit_code,
            final_exit_code = verdict.final_exit_code,
            duration_ms,
            "{}",
            verdict.message
        );

        Ok(PipelineResult {
            mode: config.mode,
            env: config.env,
            artifact,
            staged_tests,
            verdict,
            duration_ms,
        })
    }

    /// Invoke the external exclusion-resolution script.
    ///
    /// The script receives the output file path and the exclusion-mode
    /// keyword and writes one excluded test path per line.
    pub async fn resolve_exclusions(
        config: &RunConfig,
        plan: &RunPlan,
        exclusion_file: &std::path::Path,
    ) -> anyhow::Result<()> {
        let script = config.workspace.join(EXCLUSION_SCRIPT);
        let stage = StageConfig::new(
            "resolve_exclusions",
            vec![
                "bash".to_string(),
                script.display().to_string(),
                exclusion_file.display().to_string(),
                plan.exclusion_mode.as_str().to_string(),
            ],
        )
        .in_dir(config.workspace.clone());
        CommandRunner::execute_checked(&stage).await?;
        Ok(())
    }

    /// pip-install the companion wheel into the conda env.
    async fn install_companion(env: &CondaEnv, wheel: &std::path::Path) -> anyhow::Result<()> {
        let stage = StageConfig::new(
            "install_companion",
            vec![
                env.python().display().to_string(),
                "-m".to_string(),
                "pip".to_string(),
                "install".to_string(),
                wheel.display().to_string(),
            ],
        );
        CommandRunner::execute_checked(&stage).await?;
        Ok(())
    }
}

/// Requirement set for the pip path, installed in one invocation.
fn pip_install_specs(
    config: &RunConfig,
    artifact: &Artifact,
    companion: Option<&std::path::Path>,
) -> Vec<String> {
    let mut specs = vec![format!(
        "{}[{}]",
        artifact.path.display(),
        ARTIFACT_EXTRAS
    )];
    if let Some(wheel) = companion {
        specs.push(wheel.display().to_string());
    }
    specs.push("-r".to_string());
    specs.push(
        config
            .workspace
            .join(PINNED_REQUIREMENTS_FILE)
            .display()
            .to_string(),
    );
    specs
}

/// Package set for the single conda install: the artifact, its optional
/// runtime requirements from the recipe, and the test-only packages.
fn conda_install_specs(version: &str, optional: &[String]) -> Vec<String> {
    let mut specs = vec![format!("{PACKAGE_NAME}=={version}")];
    specs.extend(optional.iter().map(|req| package_name_of(req)));
    specs.extend(TEST_REQUIREMENTS.iter().map(|s| s.to_string()));
    specs
}

/// Package name of a requirement spec (name before any version constraint).
fn package_name_of(spec: &str) -> String {
    spec.split(|c: char| c.is_whitespace() || "=<>!~".contains(c))
        .next()
        .unwrap_or(spec)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relgate_core::{HostArch, HostOs, Platform};
    use std::path::PathBuf;

    fn config_for(mode: Mode, env: EnvKind) -> RunConfig {
        let mut config = RunConfig::new(
            PathBuf::from("/ws"),
            Platform::new(HostOs::Linux, HostArch::Amd64),
        );
        config.mode = mode;
        config.env = env;
        config
    }

    #[test]
    fn test_plan_release_builds_full_tree() {
        let plan = RunPlan::for_config(&config_for(Mode::Release, EnvKind::Pip));
        assert!(plan.targets.tag_filters.is_none());
        assert_eq!(plan.exclusion_mode, ExclusionMode::Unused);
    }

    #[test]
    fn test_plan_merge_gate_excludes_all_and_filters_autogen() {
        let plan = RunPlan::for_config(&config_for(Mode::MergeGate, EnvKind::Pip));
        assert_eq!(plan.exclusion_mode, ExclusionMode::All);
        assert_eq!(plan.targets.tag_filters.as_deref(), Some("-autogen"));
    }

    #[test]
    fn test_plan_marker_filter_pip_only() {
        let pip = RunPlan::for_config(&config_for(Mode::ContinuousRun, EnvKind::Pip));
        assert_eq!(pip.marker_filter.as_deref(), Some("not pip_incompatible"));

        let conda = RunPlan::for_config(&config_for(Mode::ContinuousRun, EnvKind::Conda));
        assert!(conda.marker_filter.is_none());
    }

    #[test]
    fn test_pip_install_specs_single_invocation_set() {
        let config = config_for(Mode::ContinuousRun, EnvKind::Pip);
        let artifact = Artifact {
            version: "1.7.2".to_string(),
            path: PathBuf::from("/ws/snowflake_ml_python-1.7.2-py3-none-any.whl"),
        };
        let specs = pip_install_specs(&config, &artifact, Some(std::path::Path::new("/ws/snowpark.whl")));

        assert_eq!(specs[0], "/ws/snowflake_ml_python-1.7.2-py3-none-any.whl[all]");
        assert_eq!(specs[1], "/ws/snowpark.whl");
        assert_eq!(specs[2], "-r");
        assert_eq!(specs[3], "/ws/requirements.txt");
    }

    #[test]
    fn test_conda_install_specs() {
        let specs = conda_install_specs(
            "1.7.2",
            &["lightgbm==4.1.0".to_string(), "shap >=0.42".to_string()],
        );
        assert_eq!(
            specs,
            vec![
                "snowflake-ml-python==1.7.2".to_string(),
                "lightgbm".to_string(),
                "shap".to_string(),
                "pytest".to_string(),
                "pytest-xdist".to_string(),
            ]
        );
    }

    #[test]
    fn test_package_name_of() {
        assert_eq!(package_name_of("lightgbm==4.1.0"), "lightgbm");
        assert_eq!(package_name_of("shap >=0.42"), "shap");
        assert_eq!(package_name_of("pytest"), "pytest");
    }
}
