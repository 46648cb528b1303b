//! Auxiliary toolchain provisioning.
//!
//! The conda path reads recipe metadata through yq; if no yq is on PATH a
//! platform-specific release binary is downloaded into a caller-owned temp
//! directory. Unsupported platform/architecture pairs are rejected at
//! configuration time, before any download is attempted.

use crate::error::{CiError, Result};
use relgate_core::Platform;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Release download base for yq binaries.
const YQ_RELEASE_BASE: &str = "https://github.com/mikefarah/yq/releases/latest/download";

/// Ensure a yq binary is callable, downloading one if absent.
///
/// `download_dir` must outlive the returned path; the pipeline passes a
/// `TempDir` it owns for the whole run.
pub async fn ensure_yq(platform: &Platform, download_dir: &Path) -> Result<PathBuf> {
    if yq_on_path() {
        debug!("Using yq from PATH");
        return Ok(PathBuf::from("yq"));
    }

    let asset = platform.yq_asset_name();
    let url = format!("{YQ_RELEASE_BASE}/{asset}");
    info!(%url, "Downloading yq");

    let bytes = reqwest::get(&url)
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let dest = download_dir.join("yq");
    tokio::fs::write(&dest, &bytes).await?;
    make_executable(&dest)?;

    Ok(dest)
}

/// Check whether yq answers on PATH.
fn yq_on_path() -> bool {
    std::process::Command::new("yq")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Query a YAML file with yq, returning non-empty output lines.
pub async fn yq_query(yq: &Path, expression: &str, file: &Path) -> Result<Vec<String>> {
    let output = tokio::process::Command::new(yq)
        .arg("eval")
        .arg(expression)
        .arg(file)
        .output()
        .await?;

    if !output.status.success() {
        return Err(CiError::StageFailed {
            stage: "yq query".to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "null")
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relgate_core::{HostArch, HostOs};

    #[test]
    fn test_asset_url_shape() {
        let platform = Platform::new(HostOs::Linux, HostArch::Arm64);
        let url = format!("{YQ_RELEASE_BASE}/{}", platform.yq_asset_name());
        assert_eq!(
            url,
            "https://github.com/mikefarah/yq/releases/latest/download/yq_linux_arm64"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yq");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        make_executable(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }

    #[tokio::test]
    async fn test_yq_query_with_stub() {
        // A stub standing in for yq: prints one name per line plus a blank.
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("yq");
        std::fs::write(&stub, "#!/bin/sh\nprintf 'lightgbm\\nshap\\n\\n'\n").unwrap();
        make_executable(&stub).unwrap();

        let names = yq_query(&stub, ".requirements.run_constrained[]", &stub)
            .await
            .unwrap();
        assert_eq!(names, vec!["lightgbm".to_string(), "shap".to_string()]);
    }
}
