//! Test staging: a filtered copy of the integration test tree.
//!
//! Tests run from an ephemeral directory so the installed artifact, not the
//! source tree, is what gets imported. The copy skips every path named in
//! the exclusion file.

use crate::error::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parse an exclusion file into workspace-relative paths.
///
/// One identifier per line; blank lines and `#` comments are ignored.
pub fn parse_exclusion_file(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect())
}

/// Copy the test tree at `source` into `dest`, skipping excluded paths.
///
/// Exclusion entries are relative to `source` and match both files and
/// whole directories. Cache directories are never copied. Returns the
/// number of files staged.
pub fn stage_tests(source: &Path, dest: &Path, excluded: &[PathBuf]) -> Result<usize> {
    let excluded: HashSet<&Path> = excluded.iter().map(PathBuf::as_path).collect();
    let mut staged = 0usize;

    copy_filtered(source, source, dest, &excluded, &mut staged)?;
    info!(
        staged,
        excluded = excluded.len(),
        dest = %dest.display(),
        "Staged test tree"
    );
    Ok(staged)
}

fn copy_filtered(
    root: &Path,
    dir: &Path,
    dest_root: &Path,
    excluded: &HashSet<&Path>,
    staged: &mut usize,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();

        // Never stage caches or hidden entries.
        if name.starts_with('.') || name == "__pycache__" {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        if is_excluded(relative, excluded) {
            debug!(path = %relative.display(), "Excluding test path");
            continue;
        }

        let dest = dest_root.join(relative);
        if path.is_dir() {
            copy_filtered(root, &path, dest_root, excluded, staged)?;
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&path, &dest)?;
            *staged += 1;
        }
    }
    Ok(())
}

/// Whether a relative path matches an exclusion entry, directly or via an
/// excluded ancestor directory.
fn is_excluded(relative: &Path, excluded: &HashSet<&Path>) -> bool {
    relative
        .ancestors()
        .any(|ancestor| !ancestor.as_os_str().is_empty() && excluded.contains(ancestor))
}
