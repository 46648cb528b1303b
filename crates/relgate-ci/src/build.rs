//! Artifact building: the Bazel wheel, the conda package, and the optional
//! companion snowpark wheel from the sibling workspace.

use crate::error::CiError;
use crate::runner::CommandRunner;
use crate::stage::StageConfig;
use anyhow::Context;
use py_env_manager::{find_interpreter, VirtualEnv, REQUIRED_PYTHON_VERSION};
use relgate_core::{extract_version, BuildTargetSet, RunConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Source-of-truth version declaration, relative to the workspace root.
pub const VERSION_FILE: &str = "snowflake/ml/version.bzl";

/// Distribution name of the package under test.
pub const PACKAGE_NAME: &str = "snowflake-ml-python";

/// Bazel target producing the wheel.
pub const WHEEL_TARGET: &str = "//snowflake/ml:wheel";

/// Bazel output directory holding the built wheel.
pub const WHEEL_OUTPUT_DIR: &str = "bazel-bin/snowflake/ml";

/// Conda recipe directory, relative to the workspace root.
pub const CONDA_RECIPE_DIR: &str = "ci/conda_recipe";

/// Local channel directory conda-build writes into.
pub const CONDA_CHANNEL_DIR: &str = "conda-bld";

/// Sibling directory holding the companion snowpark workspace.
pub const COMPANION_WORKSPACE: &str = "snowpark-python";

/// A built package artifact. Exactly one primary artifact exists per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Version extracted from the version declaration file.
    pub version: String,

    /// Location of the wheel file (pip) or local channel directory (conda).
    pub path: PathBuf,
}

/// Builds the release artifacts for one run.
pub struct ArtifactBuilder<'a> {
    config: &'a RunConfig,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }

    /// Read the package version from the version declaration file.
    pub fn package_version(&self) -> anyhow::Result<String> {
        let path = self.config.workspace.join(VERSION_FILE);
        extract_version(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// Stage for building the selected test targets.
    pub fn bazel_build_stage(&self, targets: &BuildTargetSet) -> StageConfig {
        let mut command = vec![self.config.bazel_path.display().to_string()];
        command.extend(targets.bazel_args());
        StageConfig::new("bazel_build_tests", command).in_dir(self.config.workspace.clone())
    }

    /// Build the mode-selected test targets. Fail-fast.
    pub async fn build_targets(&self, targets: &BuildTargetSet) -> anyhow::Result<()> {
        info!(pattern = %targets.pattern, "Building test targets");
        CommandRunner::execute_checked(&self.bazel_build_stage(targets)).await?;
        Ok(())
    }

    /// Build the wheel via Bazel and copy it to the workspace root.
    pub async fn build_wheel(&self, version: &str) -> anyhow::Result<Artifact> {
        clean_stale_wheels(&self.config.workspace)?;

        let command = vec![
            self.config.bazel_path.display().to_string(),
            "build".to_string(),
            WHEEL_TARGET.to_string(),
        ];
        let stage = StageConfig::new("bazel_build_wheel", command)
            .in_dir(self.config.workspace.clone());
        CommandRunner::execute_checked(&stage).await?;

        let built = find_wheel(
            &self.config.workspace.join(WHEEL_OUTPUT_DIR),
            &PACKAGE_NAME.replace('-', "_"),
        )?;
        let dest = self
            .config
            .workspace
            .join(built.file_name().context("wheel has no file name")?);
        std::fs::copy(&built, &dest)?;
        info!(wheel = %dest.display(), version, "Built wheel");

        Ok(Artifact {
            version: version.to_string(),
            path: dest,
        })
    }

    /// Build the conda package into the workspace-local channel.
    pub async fn build_conda_package(&self, version: &str) -> anyhow::Result<Artifact> {
        // Purge stale build caches so nothing from a prior run is reused.
        let purge = StageConfig::new(
            "conda_build_purge",
            vec!["conda".to_string(), "build".to_string(), "purge".to_string()],
        )
        .in_dir(self.config.workspace.clone());
        CommandRunner::execute_checked(&purge).await?;

        let channel_dir = self.config.workspace.join(CONDA_CHANNEL_DIR);
        let build = StageConfig::new(
            "conda_build",
            vec![
                "conda".to_string(),
                "build".to_string(),
                "--prefix-length".to_string(),
                "0".to_string(),
                "--output-folder".to_string(),
                channel_dir.display().to_string(),
                CONDA_RECIPE_DIR.to_string(),
            ],
        )
        .in_dir(self.config.workspace.clone());
        CommandRunner::execute_checked(&build).await?;
        info!(channel = %channel_dir.display(), version, "Built conda package");

        Ok(Artifact {
            version: version.to_string(),
            path: channel_dir,
        })
    }

    /// Build the companion snowpark wheel from the sibling workspace.
    ///
    /// The build runs inside a throwaway virtualenv whose directory is
    /// dropped with this call's scope; the wheel lands at the workspace
    /// root next to the primary artifact.
    pub async fn build_companion_wheel(&self) -> anyhow::Result<PathBuf> {
        let sibling = self
            .config
            .workspace
            .parent()
            .context("workspace has no parent directory")?
            .join(COMPANION_WORKSPACE);
        if !sibling.is_dir() {
            return Err(CiError::CompanionWorkspaceNotFound(sibling.display().to_string()).into());
        }

        let interpreter = find_interpreter(REQUIRED_PYTHON_VERSION)?;
        let build_dir = TempDir::new()?;
        let venv = VirtualEnv::create(&interpreter, &build_dir.path().join("build-venv")).await?;
        venv.pip_install(&["build".to_string(), "wheel".to_string()])
            .await?;

        let stage = StageConfig::new(
            "companion_wheel",
            vec![
                venv.python().display().to_string(),
                "-m".to_string(),
                "pip".to_string(),
                "wheel".to_string(),
                "--no-deps".to_string(),
                "-w".to_string(),
                self.config.workspace.display().to_string(),
                sibling.display().to_string(),
            ],
        );
        CommandRunner::execute_checked(&stage).await?;

        let wheel = find_wheel(&self.config.workspace, "snowpark")?;
        info!(wheel = %wheel.display(), "Built companion wheel");
        Ok(wheel)
    }
}

/// Delete wheels left at the workspace root by a prior run.
fn clean_stale_wheels(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "whl").unwrap_or(false) {
            info!(wheel = %path.display(), "Removing stale wheel");
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Locate a wheel in `dir` whose file name contains `needle`.
fn find_wheel(dir: &Path, needle: &str) -> Result<PathBuf, CiError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        if name.ends_with(".whl") && name.contains(needle) {
            return Ok(path);
        }
    }
    Err(CiError::ArtifactNotFound {
        pattern: format!("{needle}*.whl"),
        dir: dir.display().to_string(),
    })
}
