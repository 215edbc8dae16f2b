//! Project folder layout and delivery paths.
//!
//! A project folder holds the rendering-application assets a batch renders
//! from (`intro.aep`, `intro.jsx`, `intro.scpt`, and optionally `pause.aep`,
//! `outro.aep`, `bgloop.aep`). Delivery artifacts are written next to the
//! project folder, one file per event id.

use std::path::{Path, PathBuf};

use crate::event::{EventId, ReservedJob};

/// Intro project file.
pub const INTRO_PROJECT: &str = "intro.aep";
/// Intro script template with `$field` placeholders.
pub const INTRO_SCRIPT: &str = "intro.jsx";
/// Automation-bridge script (macOS only).
pub const INTRO_AUTOMATION: &str = "intro.scpt";

/// Containers the pipeline reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// MPEG transport stream, the broadcast delivery format.
    MpegTs,
    QuickTime,
    Avi,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Container::MpegTs => "ts",
            Container::QuickTime => "mov",
            Container::Avi => "avi",
        }
    }
}

/// Extensions that count as an existing delivery for the idempotency check.
pub const DELIVERED_CONTAINERS: [Container; 2] = [Container::MpegTs, Container::QuickTime];

/// A project folder on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFolder {
    root: PathBuf,
    delivery_dir: PathBuf,
}

impl ProjectFolder {
    /// Open a project folder. Deliveries go to its parent directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ModelError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ModelError::ValidationError {
                message: format!("project folder {} does not exist", root.display()),
            });
        }
        let delivery_dir = match root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self { root, delivery_dir })
    }

    /// Override where delivery artifacts are written.
    pub fn with_delivery_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.delivery_dir = dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn delivery_dir(&self) -> &Path {
        &self.delivery_dir
    }

    pub fn asset(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn intro_project(&self) -> PathBuf {
        self.asset(INTRO_PROJECT)
    }

    pub fn intro_script(&self) -> PathBuf {
        self.asset(INTRO_SCRIPT)
    }

    pub fn intro_automation(&self) -> PathBuf {
        self.asset(INTRO_AUTOMATION)
    }

    pub fn reserved_project(&self, job: ReservedJob) -> PathBuf {
        self.asset(&job.project_asset())
    }

    /// `<delivery-dir>/<id>.<ext>`
    pub fn delivery_path(&self, id: EventId, container: Container) -> PathBuf {
        self.delivery_dir
            .join(format!("{id}.{}", container.extension()))
    }

    /// An already delivered artifact for `id`, if any.
    pub fn existing_delivery(&self, id: EventId) -> Option<PathBuf> {
        DELIVERED_CONTAINERS
            .iter()
            .map(|container| self.delivery_path(id, *container))
            .find(|path| path.exists())
    }

    /// Presence of every known asset, for capability reports.
    pub fn asset_inventory(&self) -> Vec<(String, bool)> {
        let mut names = vec![
            INTRO_PROJECT.to_string(),
            INTRO_SCRIPT.to_string(),
            INTRO_AUTOMATION.to_string(),
        ];
        names.extend(ReservedJob::ALL.iter().map(|job| job.project_asset()));
        names
            .into_iter()
            .map(|name| {
                let present = self.asset(&name).is_file();
                (name, present)
            })
            .collect()
    }
}

/// Errors raised while building the data model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error{}: {source}", in_path(.path))]
    ParseError {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },

    #[error("Invalid event id '{value}': expected a positive integer or one of pause, outro, bgloop")]
    InvalidId { value: String },

    #[error("Duplicate event id {id}")]
    DuplicateId { id: EventId },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

fn in_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_dir_is_project_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("myproject");
        std::fs::create_dir_all(&root).unwrap();

        let project = ProjectFolder::open(&root).unwrap();
        assert_eq!(project.delivery_dir(), tmp.path());
        assert_eq!(
            project.delivery_path(EventId::Reserved(ReservedJob::Pause), Container::MpegTs),
            tmp.path().join("pause.ts")
        );
        assert_eq!(project.intro_script(), root.join("intro.jsx"));
    }

    #[test]
    fn test_open_rejects_missing_folder() {
        let err = ProjectFolder::open("/definitely/not/a/project").unwrap_err();
        assert!(matches!(err, ModelError::ValidationError { .. }));
    }

    #[test]
    fn test_existing_delivery_checks_ts_and_mov() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        std::fs::create_dir_all(&root).unwrap();
        let project = ProjectFolder::open(&root).unwrap();

        assert_eq!(project.existing_delivery(EventId::Talk(5)), None);

        std::fs::write(tmp.path().join("5.mov"), b"clip").unwrap();
        assert_eq!(
            project.existing_delivery(EventId::Talk(5)),
            Some(tmp.path().join("5.mov"))
        );

        std::fs::write(tmp.path().join("6.avi"), b"clip").unwrap();
        assert_eq!(project.existing_delivery(EventId::Talk(6)), None);
    }

    #[test]
    fn test_asset_inventory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("pause.aep"), b"aep").unwrap();
        let project = ProjectFolder::open(tmp.path()).unwrap();

        let inventory = project.asset_inventory();
        assert_eq!(inventory.len(), 6);
        assert!(inventory.contains(&("pause.aep".to_string(), true)));
        assert!(inventory.contains(&("intro.aep".to_string(), false)));
    }

    #[test]
    fn test_delivery_dir_override() {
        let tmp = tempfile::tempdir().unwrap();
        let project = ProjectFolder::open(tmp.path())
            .unwrap()
            .with_delivery_dir("/srv/out");
        assert_eq!(
            project.delivery_path(EventId::Talk(9), Container::Avi),
            PathBuf::from("/srv/out/9.avi")
        );
    }
}
