//! Process-scoped scratch directory.
//!
//! One workspace is created per batch. Every intermediate file of every job
//! lives inside it, named after the event id, and the whole directory is
//! removed when the workspace is closed or dropped, including on error and
//! panic unwinding.

use std::path::{Path, PathBuf};

use bumper_common::error::{BumperError, BumperResult};
use bumper_project_model::EventId;
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "bumper-";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace in the system temp directory.
    pub fn create() -> BumperResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| BumperError::Other(anyhow::anyhow!("Failed to create workspace: {e}")))?;
        tracing::debug!(path = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    /// Create a workspace below `base`.
    pub fn create_in(base: &Path) -> BumperResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(base)
            .map_err(|e| {
                BumperError::Other(anyhow::anyhow!(
                    "Failed to create workspace in {}: {e}",
                    base.display()
                ))
            })?;
        tracing::debug!(path = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `<workspace>/<id>.<extension>`
    pub fn file(&self, id: EventId, extension: &str) -> PathBuf {
        self.dir.path().join(format!("{id}.{extension}"))
    }

    /// Remove the workspace, reporting removal errors instead of ignoring them.
    pub fn close(self) -> BumperResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "Removed workspace");
        Ok(())
    }
}
