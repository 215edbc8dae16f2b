//! Windows: edits are applied by launching the application headless twice.

use std::time::Duration;

use bumper_common::config::RendererConfig;
use bumper_common::error::BumperResult;
use bumper_platform_core::HostPlatform;
use bumper_platform_windows::WindowsInstall;
use bumper_project_model::{Container, ProjectFolder};

use super::{preparation_steps, render_step, Dispatcher, EditPlan, Step, ToolCheck};
use crate::job::{Job, JobKind};

#[derive(Debug, Clone)]
pub struct WindowsDispatcher {
    install: WindowsInstall,
    open_settle: Duration,
    script_settle: Duration,
}

impl WindowsDispatcher {
    pub fn new(install: WindowsInstall, open_settle: Duration, script_settle: Duration) -> Self {
        Self {
            install,
            open_settle,
            script_settle,
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(
            WindowsInstall::from_config(config),
            config.open_settle(),
            config.script_settle(),
        )
    }
}

impl Dispatcher for WindowsDispatcher {
    fn host(&self) -> HostPlatform {
        HostPlatform::Windows
    }

    fn intermediate_container(&self) -> BumperResult<Container> {
        Ok(Container::Avi)
    }

    fn plan(&self, job: &Job<'_>, project: &ProjectFolder) -> BumperResult<Vec<Step>> {
        let mut steps = preparation_steps(job, project);

        if job.kind == JobKind::Ordinary {
            steps.push(Step::ApplyEdits(EditPlan::HeadlessHandshake {
                open: self
                    .install
                    .open_project_command()
                    .bind_path("jobpath", &job.paths.work_doc),
                open_settle: self.open_settle,
                run_script: self
                    .install
                    .run_script_command()
                    .bind_path("scriptpath", &job.paths.script_doc),
                script_settle: self.script_settle,
            }));
        }

        steps.push(render_step(self.install.render_command(), job));
        Ok(steps)
    }

    fn probe(&self) -> Vec<ToolCheck> {
        let support = self.install.probe();
        vec![
            ToolCheck::new("aerender", support.aerender),
            ToolCheck::new("AfterFX", support.afterfx),
        ]
    }
}
