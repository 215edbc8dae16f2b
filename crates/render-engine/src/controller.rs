//! Job admission and execution.
//!
//! `admit_and_run` decides whether an event needs rendering, runs the host's
//! step sequence and hands back the rendered job. `finalize` turns a rendered
//! job into its delivery artifact. Neither retries; a failed job leaves the
//! controller usable for the next event.

use std::path::PathBuf;

use bumper_common::error::{BumperError, BumperResult};
use bumper_project_model::{Container, Event, EventId, ProjectFolder};

use crate::dispatch::{execute_steps, Dispatcher};
use crate::finalize::{FinalDelivery, Finalizer};
use crate::job::{Job, JobState};
use crate::runner::ProcessRunner;
use crate::workspace::Workspace;

/// Operator switches for admission and finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Render even if a delivery artifact already exists.
    pub force: bool,

    /// Transcode to the delivery container; otherwise copy the intermediate clip.
    pub finalize: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            force: false,
            finalize: true,
        }
    }
}

/// Outcome of admitting one event.
#[derive(Debug)]
pub enum JobResult<'e> {
    /// The intermediate clip exists and the job awaits finalize.
    Rendered(Job<'e>),
    /// A delivery artifact already exists. No process was started.
    Skipped { existing: PathBuf },
    Failed { id: EventId, error: BumperError },
}

impl JobResult<'_> {
    pub fn job_id(&self) -> Option<EventId> {
        match self {
            JobResult::Rendered(job) => Some(job.id()),
            _ => None,
        }
    }
}

pub struct RenderController<'a> {
    project: &'a ProjectFolder,
    workspace: &'a Workspace,
    dispatcher: &'a dyn Dispatcher,
    runner: &'a dyn ProcessRunner,
    finalizer: Finalizer,
    settings: RenderSettings,
}

impl<'a> RenderController<'a> {
    pub fn new(
        project: &'a ProjectFolder,
        workspace: &'a Workspace,
        dispatcher: &'a dyn Dispatcher,
        runner: &'a dyn ProcessRunner,
        finalizer: Finalizer,
        settings: RenderSettings,
    ) -> Self {
        Self {
            project,
            workspace,
            dispatcher,
            runner,
            finalizer,
            settings,
        }
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    /// Skip, render or fail one event.
    pub async fn admit_and_run<'e>(&self, event: &'e Event) -> JobResult<'e> {
        if !self.settings.force {
            if let Some(existing) = self.project.existing_delivery(event.id) {
                tracing::info!(event_id = %event.id, path = %existing.display(), "Already rendered, skipping");
                return JobResult::Skipped { existing };
            }
        }

        let container = match self.dispatcher.intermediate_container() {
            Ok(container) => container,
            Err(error) => {
                tracing::warn!(event_id = %event.id, %error, "Job not admitted");
                return JobResult::Failed {
                    id: event.id,
                    error,
                };
            }
        };

        let mut job = Job::new(event, self.workspace, container);
        match self.render(&mut job).await {
            Ok(()) => JobResult::Rendered(job),
            Err(error) => {
                tracing::warn!(event_id = %event.id, kind = %error.kind(), %error, "Job failed");
                // Pending and Admitted can both move to Failed.
                let _ = job.advance(JobState::Failed);
                JobResult::Failed {
                    id: event.id,
                    error,
                }
            }
        }
    }

    async fn render(&self, job: &mut Job<'_>) -> BumperResult<()> {
        let steps = self.dispatcher.plan(job, self.project)?;
        job.advance(JobState::Admitted)?;
        tracing::info!(
            event_id = %job.id(),
            comp = job.kind.comp_name(),
            steps = steps.len(),
            "Rendering"
        );

        execute_steps(&steps, job.event, self.runner).await?;

        if !job.paths.intermediate_clip.is_file() {
            return Err(BumperError::external_tool(
                "aerender",
                format!(
                    "exited without writing {}",
                    job.paths.intermediate_clip.display()
                ),
            ));
        }
        job.advance(JobState::Rendered)
    }

    /// Produce the delivery artifact of a rendered job: a transcode, or a
    /// verbatim copy of the intermediate clip when finalize is disabled.
    pub async fn finalize(&self, job: &mut Job<'_>) -> BumperResult<FinalDelivery> {
        let result = if self.settings.finalize {
            let delivery = self.project.delivery_path(job.id(), Container::MpegTs);
            self.finalizer
                .transcode(self.runner, &job.paths.intermediate_clip, &delivery)
                .await
        } else {
            let delivery = self.project.delivery_path(job.id(), job.paths.intermediate);
            self.finalizer
                .copy_verbatim(&job.paths.intermediate_clip, &delivery)
                .await
        };

        match result {
            Ok(delivery) => {
                job.advance(JobState::Finalized)?;
                Ok(delivery)
            }
            Err(error) => {
                tracing::warn!(event_id = %job.id(), %error, "Finalize failed");
                let _ = job.advance(JobState::Failed);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use bumper_common::config::RendererConfig;
    use bumper_common::error::ErrorKind;
    use bumper_platform_core::{CommandLine, HostPlatform};
    use bumper_project_model::ReservedJob;

    use crate::dispatch::HostDispatcher;
    use crate::finalize::FinalizeMethod;

    /// Creates whatever file follows `-output`, and the last ffmpeg argument.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ProcessRunner for Recorder {
        async fn run(&self, command: &CommandLine) -> BumperResult<()> {
            self.calls.lock().unwrap().push(command.tool_name());
            if let Some(pos) = command.args.iter().position(|a| a == "-output") {
                std::fs::write(&command.args[pos + 1], b"clip").unwrap();
            }
            if command.tool_name() == "ffmpeg" {
                std::fs::write(command.args.last().unwrap(), b"ts").unwrap();
            }
            Ok(())
        }

        async fn launch_detached(&self, command: &CommandLine) -> BumperResult<()> {
            self.calls.lock().unwrap().push(command.tool_name());
            Ok(())
        }

        async fn settle(&self, _duration: Duration) {}
    }

    struct Fixture {
        _base: tempfile::TempDir,
        project: ProjectFolder,
        workspace: Workspace,
        dispatcher: HostDispatcher,
    }

    fn fixture(host: HostPlatform) -> Fixture {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("project");
        std::fs::create_dir_all(&root).unwrap();
        for asset in ["intro.aep", "intro.jsx", "intro.scpt", "outro.aep"] {
            std::fs::write(root.join(asset), b"asset").unwrap();
        }
        let project = ProjectFolder::open(&root).unwrap();
        let workspace = Workspace::create_in(base.path()).unwrap();
        let dispatcher = HostDispatcher::select(host, &RendererConfig::default());
        Fixture {
            _base: base,
            project,
            workspace,
            dispatcher,
        }
    }

    fn controller<'a>(
        fx: &'a Fixture,
        runner: &'a Recorder,
        settings: RenderSettings,
    ) -> RenderController<'a> {
        RenderController::new(
            &fx.project,
            &fx.workspace,
            &fx.dispatcher,
            runner,
            Finalizer::default(),
            settings,
        )
    }

    #[tokio::test]
    async fn test_existing_delivery_is_skipped_without_processes() {
        let fx = fixture(HostPlatform::MacOS);
        std::fs::write(fx.project.delivery_dir().join("4.ts"), b"done").unwrap();
        let runner = Recorder::default();
        let ctl = controller(&fx, &runner, RenderSettings::default());
        let event = Event::new(EventId::Talk(4), "Four");

        for _ in 0..2 {
            let result = ctl.admit_and_run(&event).await;
            assert!(matches!(result, JobResult::Skipped { .. }));
            assert_eq!(result.job_id(), None);
        }
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_force_renders_over_existing_delivery() {
        let fx = fixture(HostPlatform::MacOS);
        std::fs::write(fx.project.delivery_dir().join("4.mov"), b"done").unwrap();
        let runner = Recorder::default();
        let settings = RenderSettings {
            force: true,
            ..RenderSettings::default()
        };
        let ctl = controller(&fx, &runner, settings);
        let event = Event::new(EventId::Talk(4), "Four");

        let result = ctl.admit_and_run(&event).await;
        assert_eq!(result.job_id(), Some(EventId::Talk(4)));
        assert_eq!(*runner.calls.lock().unwrap(), ["osascript", "aerender"]);
    }

    #[tokio::test]
    async fn test_reserved_job_renders_and_finalizes() {
        let fx = fixture(HostPlatform::Windows);
        let runner = Recorder::default();
        let ctl = controller(&fx, &runner, RenderSettings::default());
        let event = Event::reserved(ReservedJob::Outro);

        let JobResult::Rendered(mut job) = ctl.admit_and_run(&event).await else {
            panic!("expected rendered job");
        };
        assert_eq!(job.paths.intermediate_clip, fx.workspace.file(event.id, "avi"));

        let delivery = ctl.finalize(&mut job).await.unwrap();
        assert_eq!(delivery.path, fx.project.delivery_dir().join("outro.ts"));
        assert_eq!(delivery.method, FinalizeMethod::Transcoded);
        assert_eq!(job.state(), JobState::Finalized);
    }

    #[tokio::test]
    async fn test_no_finalize_copies_host_container() {
        let fx = fixture(HostPlatform::Windows);
        let runner = Recorder::default();
        let settings = RenderSettings {
            finalize: false,
            ..RenderSettings::default()
        };
        let ctl = controller(&fx, &runner, settings);
        let event = Event::new(EventId::Talk(9), "Nine");

        let JobResult::Rendered(mut job) = ctl.admit_and_run(&event).await else {
            panic!("expected rendered job");
        };
        let delivery = ctl.finalize(&mut job).await.unwrap();
        assert_eq!(delivery.path, fx.project.delivery_dir().join("9.avi"));
        assert_eq!(delivery.method, FinalizeMethod::Copied);
        assert!(!runner.calls.lock().unwrap().contains(&"ffmpeg".to_string()));
    }

    #[tokio::test]
    async fn test_missing_reserved_asset_fails_job() {
        let fx = fixture(HostPlatform::MacOS);
        let runner = Recorder::default();
        let ctl = controller(&fx, &runner, RenderSettings::default());
        let event = Event::reserved(ReservedJob::Bgloop);

        let JobResult::Failed { id, error } = ctl.admit_and_run(&event).await else {
            panic!("expected failure");
        };
        assert_eq!(id, EventId::Reserved(ReservedJob::Bgloop));
        assert_eq!(error.kind(), ErrorKind::ExternalToolFailure);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_host_fails_before_any_step() {
        let fx = fixture(HostPlatform::Linux);
        let runner = Recorder::default();
        let ctl = controller(&fx, &runner, RenderSettings::default());
        let event = Event::new(EventId::Talk(1), "One");

        let JobResult::Failed { error, .. } = ctl.admit_and_run(&event).await else {
            panic!("expected failure");
        };
        assert_eq!(error.kind(), ErrorKind::UnsupportedPlatform);
        assert!(runner.calls.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(fx.workspace.path()).unwrap().count(), 0);
    }
}
