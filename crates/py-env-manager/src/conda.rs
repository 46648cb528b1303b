//! Conda environment lifecycle and package resolution.

use crate::error::{PyEnvError, Result};
use crate::interpreter::is_conda_available;
use crate::run_checked;
use std::path::{Path, PathBuf};
use tracing::info;

/// Handle to a conda environment addressed by prefix path.
#[derive(Debug, Clone)]
pub struct CondaEnv {
    prefix: PathBuf,
}

impl CondaEnv {
    /// Create a fresh conda env at `prefix` with the given python version.
    pub async fn create(prefix: &Path, python_version: &str) -> Result<CondaEnv> {
        if !is_conda_available() {
            return Err(PyEnvError::CondaNotFound);
        }

        info!(prefix = %prefix.display(), "Creating conda env");
        run_checked(
            Path::new("conda"),
            &[
                "create".to_string(),
                "-y".to_string(),
                "-p".to_string(),
                prefix.display().to_string(),
                format!("python={python_version}"),
            ],
            "conda env creation",
        )
        .await?;

        Ok(CondaEnv {
            prefix: prefix.to_path_buf(),
        })
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Path of the environment's python executable.
    pub fn python(&self) -> PathBuf {
        if cfg!(windows) {
            self.prefix.join("python.exe")
        } else {
            self.prefix.join("bin").join("python")
        }
    }

    /// Install package specs from the given channels in one resolver pass.
    ///
    /// Channels are searched in order, so the local build channel goes
    /// first. Everything must be resolved in a single invocation; see
    /// `VirtualEnv::pip_install` for the matching pip constraint.
    pub async fn install(&self, channels: &[String], specs: &[String]) -> Result<()> {
        info!(
            count = specs.len(),
            channels = channels.len(),
            "Installing packages into conda env"
        );

        let mut args = vec![
            "install".to_string(),
            "-y".to_string(),
            "-p".to_string(),
            self.prefix.display().to_string(),
            "--freeze-installed".to_string(),
            "--override-channels".to_string(),
        ];
        for channel in channels {
            args.push("-c".to_string());
            args.push(channel.clone());
        }
        args.extend(specs.iter().cloned());

        run_checked(Path::new("conda"), &args, "conda install").await?;
        Ok(())
    }

    /// Remove the environment. Best-effort companion to prefix-dir cleanup.
    pub async fn remove(self) -> Result<()> {
        run_checked(
            Path::new("conda"),
            &[
                "env".to_string(),
                "remove".to_string(),
                "-y".to_string(),
                "-p".to_string(),
                self.prefix.display().to_string(),
            ],
            "conda env removal",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_path_layout() {
        let env = CondaEnv {
            prefix: PathBuf::from("/tmp/testenv"),
        };
        let python = env.python();
        if cfg!(windows) {
            assert!(python.ends_with("python.exe"));
        } else {
            assert!(python.ends_with("bin/python"));
        }
        assert!(python.starts_with("/tmp/testenv"));
    }
}
