//! Error types shared across Bumper crates.

use std::fmt;
use std::path::PathBuf;

/// Top-level error type for Bumper operations.
#[derive(Debug, thiserror::Error)]
pub enum BumperError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Project asset not found: {path}")]
    MissingAsset { path: PathBuf },

    #[error("No render dispatch path for host platform '{os}'")]
    UnsupportedPlatform { os: String },

    #[error("Template error: {message}")]
    Template { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BumperError.
pub type BumperResult<T> = Result<T, BumperError>;

/// Coarse failure classes used for reporting and propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// Invalid arguments or conflicting mode flags. Aborts before any job runs.
    ConfigurationError,
    /// A renderer, automation or transcoder step failed. Scoped to one job.
    ExternalToolFailure,
    /// The host has no dispatch path. Scoped to one job.
    UnsupportedPlatform,
    /// Anything else (workspace I/O, serialization).
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::ExternalToolFailure => "ExternalToolFailure",
            ErrorKind::UnsupportedPlatform => "UnsupportedPlatform",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

impl BumperError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn external_tool(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    pub fn missing_asset(path: impl Into<PathBuf>) -> Self {
        Self::MissingAsset { path: path.into() }
    }

    pub fn unsupported_platform(os: impl Into<String>) -> Self {
        Self::UnsupportedPlatform { os: os.into() }
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Classify this error.
    ///
    /// A missing project asset counts as a tool failure: the job's tool chain
    /// cannot run without it, and it is scoped to the job like any other
    /// external failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BumperError::Config { .. } | BumperError::Template { .. } => {
                ErrorKind::ConfigurationError
            }
            BumperError::ExternalTool { .. } | BumperError::MissingAsset { .. } => {
                ErrorKind::ExternalToolFailure
            }
            BumperError::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            BumperError::Io(_) | BumperError::Json(_) | BumperError::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the batch may continue with the next event after this error.
    pub fn is_job_scoped(&self) -> bool {
        self.kind() != ErrorKind::ConfigurationError
    }
}
