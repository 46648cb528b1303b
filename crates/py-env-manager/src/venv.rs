//! Virtualenv lifecycle and pip installation.

use crate::error::Result;
use crate::run_checked;
use std::path::{Path, PathBuf};
use tracing::info;

/// Handle to a virtualenv rooted at a known directory.
///
/// The directory itself is owned by the caller (typically a
/// `tempfile::TempDir`), so cleanup is guaranteed by that scope and not
/// managed here.
#[derive(Debug, Clone)]
pub struct VirtualEnv {
    root: PathBuf,
}

impl VirtualEnv {
    /// Create a fresh virtualenv at `root` using the given interpreter.
    pub async fn create(interpreter: &Path, root: &Path) -> Result<VirtualEnv> {
        info!(root = %root.display(), "Creating virtualenv");
        run_checked(
            interpreter,
            &[
                "-m".to_string(),
                "venv".to_string(),
                root.display().to_string(),
            ],
            "virtualenv creation",
        )
        .await?;
        Ok(Self::at(root))
    }

    /// Wrap an already-created virtualenv.
    pub fn at(root: &Path) -> VirtualEnv {
        VirtualEnv {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the environment's python executable.
    pub fn python(&self) -> PathBuf {
        self.bin_dir().join(if cfg!(windows) {
            "python.exe"
        } else {
            "python"
        })
    }

    fn bin_dir(&self) -> PathBuf {
        self.root
            .join(if cfg!(windows) { "Scripts" } else { "bin" })
    }

    /// Install a set of requirement specs in a single pip invocation.
    ///
    /// The whole set must go into one call: splitting it across multiple
    /// installs lets pip resolve each subset independently and the combined
    /// environment can end up inconsistent.
    pub async fn pip_install(&self, specs: &[String]) -> Result<()> {
        info!(count = specs.len(), "Installing packages into virtualenv");
        let mut args = vec![
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
        ];
        args.extend(specs.iter().cloned());
        run_checked(&self.python(), &args, "pip install").await?;
        Ok(())
    }

    /// List the installed package set (diagnostic output).
    pub async fn pip_list(&self) -> Result<String> {
        run_checked(
            &self.python(),
            &["-m".to_string(), "pip".to_string(), "list".to_string()],
            "pip list",
        )
        .await
    }
}
