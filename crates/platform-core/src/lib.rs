//! Bumper platform core contracts.
//!
//! This crate contains the host identification and command-template types
//! shared by the per-platform crates and the render engine, without coupling
//! to a concrete OS.

pub mod command;

pub use command::{CommandLine, CommandSpec, CommandTemplate};

use serde::{Deserialize, Serialize};

/// Host operating system family, as far as rendering is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPlatform {
    MacOS,
    Windows,
    Linux,
    Other(String),
}

impl HostPlatform {
    /// Platform the current binary was built for.
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style name.
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "macos" => HostPlatform::MacOS,
            "windows" => HostPlatform::Windows,
            "linux" => HostPlatform::Linux,
            other => HostPlatform::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HostPlatform::MacOS => "macos",
            HostPlatform::Windows => "windows",
            HostPlatform::Linux => "linux",
            HostPlatform::Other(name) => name,
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `program` can be launched: bare names are looked up on `PATH`,
/// anything containing a separator is checked as a file path.
pub fn executable_available(program: &str) -> bool {
    let path = std::path::Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    let candidates: &[&str] = if cfg!(windows) { &["", ".exe"] } else { &[""] };
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                candidates
                    .iter()
                    .any(|ext| dir.join(format!("{program}{ext}")).is_file())
            })
        })
        .unwrap_or(false)
}
