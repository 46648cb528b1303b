//! Package version extraction from the version declaration file.
//!
//! The source of truth is a Starlark-style declaration of the form
//! `VERSION = "1.2.3"`. The value must be a quoted dotted-numeric string.

use crate::error::{CoreError, Result};
use std::path::Path;

/// Name of the constant carrying the package version.
const VERSION_CONSTANT: &str = "VERSION";

/// Extract the package version from a version declaration file.
pub fn extract_version(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)?;

    for line in contents.lines() {
        let Some((lhs, rhs)) = line.split_once('=') else {
            continue;
        };
        if lhs.trim() != VERSION_CONSTANT {
            continue;
        }

        let rhs = rhs.trim();
        let value = rhs
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .ok_or_else(|| CoreError::MalformedVersion(rhs.to_string()))?;

        if !is_dotted_numeric(value) {
            return Err(CoreError::MalformedVersion(value.to_string()));
        }
        return Ok(value.to_string());
    }

    Err(CoreError::VersionNotFound(path.display().to_string()))
}

/// Whether a string is one or more dot-separated numeric components.
fn is_dotted_numeric(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
