//! Host platform detection and tool asset mapping.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported host operating systems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HostOs {
    Linux,
    MacOs,
}

impl HostOs {
    /// Name used in yq release asset file names.
    pub fn asset_name(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::MacOs => "darwin",
        }
    }
}

/// Supported host architectures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HostArch {
    Amd64,
    Arm64,
}

impl HostArch {
    /// Name used in yq release asset file names.
    pub fn asset_name(&self) -> &'static str {
        match self {
            HostArch::Amd64 => "amd64",
            HostArch::Arm64 => "arm64",
        }
    }
}

/// Host platform (OS + architecture) of the machine driving the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: HostOs,
    pub arch: HostArch,
}

impl Platform {
    pub fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Validate an (os, arch) pair as reported by `std::env::consts`.
    ///
    /// Unsupported combinations fail here, before any tool download is
    /// attempted.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        let host_os = match os {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            _ => {
                return Err(CoreError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        let host_arch = match arch {
            "x86_64" => HostArch::Amd64,
            "aarch64" => HostArch::Arm64,
            _ => {
                return Err(CoreError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        Ok(Self::new(host_os, host_arch))
    }

    /// Detect the platform of the current host.
    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// File name of the yq release asset for this platform.
    pub fn yq_asset_name(&self) -> String {
        format!("yq_{}_{}", self.os.asset_name(), self.arch.asset_name())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.asset_name(), self.arch.asset_name())
    }
}
