//! Runtime realization of rendering one event.

use std::fmt;
use std::path::PathBuf;

use bumper_common::error::{BumperError, BumperResult};
use bumper_project_model::{Container, Event, EventId, ReservedJob};

use crate::workspace::Workspace;

/// Composition rendered for ordinary events.
pub const INTRO_COMP: &str = "intro";

/// Which asset chain a job renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Intro project edited by the per-event script.
    Ordinary,
    /// Fixed project rendered as is.
    Reserved(ReservedJob),
}

impl JobKind {
    pub fn of(event: &Event) -> Self {
        match event.reserved_job() {
            Some(job) => JobKind::Reserved(job),
            None => JobKind::Ordinary,
        }
    }

    /// Composition the renderer is pointed at.
    pub fn comp_name(self) -> &'static str {
        match self {
            JobKind::Ordinary => INTRO_COMP,
            JobKind::Reserved(job) => job.token(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Admitted,
    Rendered,
    Finalized,
    Skipped,
    Failed,
}

impl JobState {
    fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Admitted)
                | (Pending, Skipped)
                | (Pending, Failed)
                | (Admitted, Rendered)
                | (Admitted, Failed)
                | (Rendered, Finalized)
                | (Rendered, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Admitted => "admitted",
            JobState::Rendered => "rendered",
            JobState::Finalized => "finalized",
            JobState::Skipped => "skipped",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Scratch files of one job, all inside the workspace and named by event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    /// Working copy of the project file the renderer reads.
    pub work_doc: PathBuf,
    /// Expanded script (ordinary jobs).
    pub script_doc: PathBuf,
    /// Copied automation bridge (ordinary jobs, bridge hosts).
    pub automation_doc: PathBuf,
    /// Renderer output.
    pub intermediate_clip: PathBuf,
    /// Container of the renderer output.
    pub intermediate: Container,
}

impl JobPaths {
    pub fn new(workspace: &Workspace, id: EventId, intermediate: Container) -> Self {
        Self {
            work_doc: workspace.file(id, "aep"),
            script_doc: workspace.file(id, "jsx"),
            automation_doc: workspace.file(id, "scpt"),
            intermediate_clip: workspace.file(id, intermediate.extension()),
            intermediate,
        }
    }
}

/// One event being rendered. Borrows the event; never mutates it.
#[derive(Debug)]
pub struct Job<'e> {
    pub event: &'e Event,
    pub kind: JobKind,
    pub paths: JobPaths,
    state: JobState,
    history: Vec<JobState>,
}

impl<'e> Job<'e> {
    pub fn new(event: &'e Event, workspace: &Workspace, intermediate: Container) -> Self {
        Self {
            event,
            kind: JobKind::of(event),
            paths: JobPaths::new(workspace, event.id, intermediate),
            state: JobState::Pending,
            history: vec![JobState::Pending],
        }
    }

    pub fn id(&self) -> EventId {
        self.event.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// States passed through so far, starting with `Pending`.
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    pub fn advance(&mut self, next: JobState) -> BumperResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(BumperError::Other(anyhow::anyhow!(
                "job {} cannot move from {} to {}",
                self.event.id,
                self.state,
                next
            )));
        }
        tracing::debug!(event_id = %self.event.id, from = %self.state, to = %next, "Job state");
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let base = tempfile::tempdir().unwrap();
        let workspace = Workspace::create_in(base.path()).unwrap();
        (base, workspace)
    }

    #[test]
    fn test_kind_and_comp() {
        let talk = Event::new(EventId::Talk(3), "Talk");
        let outro = Event::reserved(ReservedJob::Outro);
        assert_eq!(JobKind::of(&talk), JobKind::Ordinary);
        assert_eq!(JobKind::of(&talk).comp_name(), "intro");
        assert_eq!(JobKind::of(&outro).comp_name(), "outro");
    }

    #[test]
    fn test_paths_are_named_by_id() {
        let (_base, ws) = workspace();
        let event = Event::reserved(ReservedJob::Bgloop);
        let job = Job::new(&event, &ws, Container::QuickTime);
        assert_eq!(job.paths.work_doc, ws.path().join("bgloop.aep"));
        assert_eq!(job.paths.intermediate_clip, ws.path().join("bgloop.mov"));
    }

    #[test]
    fn test_happy_path_transitions() {
        let (_base, ws) = workspace();
        let event = Event::new(EventId::Talk(1), "T");
        let mut job = Job::new(&event, &ws, Container::Avi);
        job.advance(JobState::Admitted).unwrap();
        job.advance(JobState::Rendered).unwrap();
        job.advance(JobState::Finalized).unwrap();
        assert!(job.advance(JobState::Failed).is_err());
        assert_eq!(
            job.history(),
            [
                JobState::Pending,
                JobState::Admitted,
                JobState::Rendered,
                JobState::Finalized
            ]
        );
    }

    #[test]
    fn test_skipped_jobs_never_render() {
        let (_base, ws) = workspace();
        let event = Event::new(EventId::Talk(1), "T");
        let mut job = Job::new(&event, &ws, Container::Avi);
        job.advance(JobState::Skipped).unwrap();
        assert!(job.advance(JobState::Admitted).is_err());
        assert_eq!(job.state(), JobState::Skipped);
    }

    #[test]
    fn test_cannot_finalize_before_render() {
        let (_base, ws) = workspace();
        let event = Event::new(EventId::Talk(1), "T");
        let mut job = Job::new(&event, &ws, Container::Avi);
        job.advance(JobState::Admitted).unwrap();
        assert!(job.advance(JobState::Finalized).is_err());
    }
}
