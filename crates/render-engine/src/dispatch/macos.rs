//! macOS: edits go through the AppleScript bridge, rendering through `aerender`.

use bumper_common::config::RendererConfig;
use bumper_common::error::BumperResult;
use bumper_platform_core::HostPlatform;
use bumper_platform_macos::MacInstall;
use bumper_project_model::{Container, ProjectFolder};

use super::{preparation_steps, render_step, Dispatcher, EditPlan, Step, ToolCheck};
use crate::job::{Job, JobKind};

#[derive(Debug, Clone)]
pub struct MacOSDispatcher {
    install: MacInstall,
}

impl MacOSDispatcher {
    pub fn new(install: MacInstall) -> Self {
        Self { install }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(MacInstall::from_config(config))
    }
}

impl Dispatcher for MacOSDispatcher {
    fn host(&self) -> HostPlatform {
        HostPlatform::MacOS
    }

    fn intermediate_container(&self) -> BumperResult<Container> {
        Ok(Container::QuickTime)
    }

    fn plan(&self, job: &Job<'_>, project: &ProjectFolder) -> BumperResult<Vec<Step>> {
        let mut steps = preparation_steps(job, project);

        if job.kind == JobKind::Ordinary {
            steps.push(Step::CopyAsset {
                from: project.intro_automation(),
                to: job.paths.automation_doc.clone(),
            });
            let bridge = self
                .install
                .automation_bridge_command()
                .bind_path("ascript_path", &job.paths.automation_doc)
                .bind_path("jobpath", &job.paths.work_doc)
                .bind_path("scriptpath", &job.paths.script_doc);
            steps.push(Step::ApplyEdits(EditPlan::AutomationBridge(bridge)));
        }

        steps.push(render_step(self.install.render_command(), job));
        Ok(steps)
    }

    fn probe(&self) -> Vec<ToolCheck> {
        let support = self.install.probe();
        vec![
            ToolCheck::new("aerender", support.aerender),
            ToolCheck::new("osascript", support.automation_runner),
        ]
    }
}
