//! Python interpreter discovery and version checking.

use crate::error::{PyEnvError, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Interpreter version the pip test path is pinned to.
pub const REQUIRED_PYTHON_VERSION: &str = "3.9";

/// Locate a `python<version>` interpreter on PATH and verify it runs.
///
/// The probe is `python<version> --version`; anything short of a clean exit
/// is treated as "not installed".
pub fn find_interpreter(version: &str) -> Result<PathBuf> {
    let name = format!("python{version}");

    let output = Command::new(&name).arg("--version").output();
    match output {
        Ok(out) if out.status.success() => {
            let reported = String::from_utf8_lossy(&out.stdout);
            debug!(interpreter = %name, version = %reported.trim(), "Found interpreter");
            Ok(PathBuf::from(name))
        }
        _ => Err(PyEnvError::InterpreterNotFound(name)),
    }
}

/// Check whether conda is callable on PATH.
pub fn is_conda_available() -> bool {
    Command::new("conda")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_interpreter_is_descriptive() {
        // No host ships a python0.0 binary.
        let err = find_interpreter("0.0").unwrap_err();
        assert!(err.to_string().contains("python0.0"));
        assert!(err.to_string().contains("not installed"));
    }
}
