//! Platform dispatch: turning a job into an ordered list of steps that
//! produce its intermediate clip.
//!
//! The host is identified once, when a [`HostDispatcher`] is selected. Each
//! supported host is one variant implementing [`Dispatcher`]; nothing past
//! this module branches on the operating system.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bumper_common::config::RendererConfig;
use bumper_common::error::{BumperError, BumperResult};
use bumper_platform_core::{CommandSpec, HostPlatform};
use bumper_project_model::{Container, Event, ProjectFolder};
use serde::Serialize;

use crate::job::{Job, JobKind};
use crate::runner::ProcessRunner;
use crate::script::write_script;

pub mod macos;
pub mod windows;

pub use macos::MacOSDispatcher;
pub use windows::WindowsDispatcher;

/// One unit of work in a job's render sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Copy a project asset into the workspace.
    CopyAsset { from: PathBuf, to: PathBuf },
    /// Expand the script template for the job's event.
    ExpandScript { template: PathBuf, to: PathBuf },
    /// Apply the generated script's edits to the working document.
    ApplyEdits(EditPlan),
    /// Render the working document to the intermediate clip.
    Render(CommandSpec),
}

/// How edits reach the working document on a given host.
#[derive(Debug, Clone, PartialEq)]
pub enum EditPlan {
    /// A single synchronous run of the automation bridge.
    AutomationBridge(CommandSpec),
    /// Detached headless launches separated by fixed settle intervals.
    HeadlessHandshake {
        open: CommandSpec,
        open_settle: Duration,
        run_script: CommandSpec,
        script_settle: Duration,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::CopyAsset { from, .. } => write!(f, "copy {}", file_name(from)),
            Step::ExpandScript { template, .. } => write!(f, "expand {}", file_name(template)),
            Step::ApplyEdits(EditPlan::AutomationBridge(_)) => f.write_str("apply edits (bridge)"),
            Step::ApplyEdits(EditPlan::HeadlessHandshake { .. }) => {
                f.write_str("apply edits (headless)")
            }
            Step::Render(spec) => write!(f, "render {}", spec.value("comp").unwrap_or("?")),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Per-host render sequencing.
pub trait Dispatcher: Send + Sync {
    fn host(&self) -> HostPlatform;

    /// Container the renderer writes intermediate clips in.
    fn intermediate_container(&self) -> BumperResult<Container>;

    /// Steps that turn the project's assets into `job`'s intermediate clip.
    fn plan(&self, job: &Job<'_>, project: &ProjectFolder) -> BumperResult<Vec<Step>>;

    /// Whether each external tool this host needs is installed.
    fn probe(&self) -> Vec<ToolCheck>;
}

/// Result of probing one external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCheck {
    pub name: String,
    pub available: bool,
}

impl ToolCheck {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
        }
    }
}

/// The dispatcher for the host this process runs on.
#[derive(Debug, Clone)]
pub enum HostDispatcher {
    MacOS(MacOSDispatcher),
    Windows(WindowsDispatcher),
    /// No dispatch path. Every job fails with `UnsupportedPlatform`.
    Unsupported { host: HostPlatform },
}

impl HostDispatcher {
    pub fn select(host: HostPlatform, config: &RendererConfig) -> Self {
        let dispatcher = match host {
            HostPlatform::MacOS => HostDispatcher::MacOS(MacOSDispatcher::from_config(config)),
            HostPlatform::Windows => {
                HostDispatcher::Windows(WindowsDispatcher::from_config(config))
            }
            host => HostDispatcher::Unsupported { host },
        };
        tracing::debug!(host = %dispatcher.host(), supported = dispatcher.is_supported(), "Selected dispatcher");
        dispatcher
    }

    pub fn for_current_host(config: &RendererConfig) -> Self {
        Self::select(HostPlatform::detect(), config)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, HostDispatcher::Unsupported { .. })
    }

    fn unsupported(host: &HostPlatform) -> BumperError {
        BumperError::unsupported_platform(host.as_str())
    }
}

impl Dispatcher for HostDispatcher {
    fn host(&self) -> HostPlatform {
        match self {
            HostDispatcher::MacOS(d) => d.host(),
            HostDispatcher::Windows(d) => d.host(),
            HostDispatcher::Unsupported { host } => host.clone(),
        }
    }

    fn intermediate_container(&self) -> BumperResult<Container> {
        match self {
            HostDispatcher::MacOS(d) => d.intermediate_container(),
            HostDispatcher::Windows(d) => d.intermediate_container(),
            HostDispatcher::Unsupported { host } => Err(Self::unsupported(host)),
        }
    }

    fn plan(&self, job: &Job<'_>, project: &ProjectFolder) -> BumperResult<Vec<Step>> {
        match self {
            HostDispatcher::MacOS(d) => d.plan(job, project),
            HostDispatcher::Windows(d) => d.plan(job, project),
            HostDispatcher::Unsupported { host } => Err(Self::unsupported(host)),
        }
    }

    fn probe(&self) -> Vec<ToolCheck> {
        match self {
            HostDispatcher::MacOS(d) => d.probe(),
            HostDispatcher::Windows(d) => d.probe(),
            HostDispatcher::Unsupported { .. } => Vec::new(),
        }
    }
}

/// Steps shared by every host before edits are applied.
pub(crate) fn preparation_steps(job: &Job<'_>, project: &ProjectFolder) -> Vec<Step> {
    match job.kind {
        JobKind::Ordinary => vec![
            Step::ExpandScript {
                template: project.intro_script(),
                to: job.paths.script_doc.clone(),
            },
            Step::CopyAsset {
                from: project.intro_project(),
                to: job.paths.work_doc.clone(),
            },
        ],
        JobKind::Reserved(reserved) => vec![Step::CopyAsset {
            from: project.reserved_project(reserved),
            to: job.paths.work_doc.clone(),
        }],
    }
}

/// Bind the job's working document, composition and output to a render template.
pub(crate) fn render_step(render: CommandSpec, job: &Job<'_>) -> Step {
    Step::Render(
        render
            .bind_path("jobpath", &job.paths.work_doc)
            .bind("comp", job.kind.comp_name())
            .bind_path("locationpath", &job.paths.intermediate_clip),
    )
}

/// Run a planned sequence in order, stopping at the first failure.
pub async fn execute_steps(
    steps: &[Step],
    event: &Event,
    runner: &dyn ProcessRunner,
) -> BumperResult<()> {
    for step in steps {
        tracing::debug!(event_id = %event.id, step = %step, "Executing step");
        match step {
            Step::CopyAsset { from, to } => copy_asset(from, to).await?,
            Step::ExpandScript { template, to } => write_script(template, event, to).await?,
            Step::ApplyEdits(plan) => apply_edits(plan, runner).await?,
            Step::Render(spec) => runner.run(&spec.render()?).await?,
        }
    }
    Ok(())
}

/// Apply a generated script to the working document.
///
/// The headless variant has no readiness signal and relies on the settle
/// intervals alone.
pub async fn apply_edits(plan: &EditPlan, runner: &dyn ProcessRunner) -> BumperResult<()> {
    match plan {
        EditPlan::AutomationBridge(bridge) => runner.run(&bridge.render()?).await,
        EditPlan::HeadlessHandshake {
            open,
            open_settle,
            run_script,
            script_settle,
        } => {
            runner.launch_detached(&open.render()?).await?;
            runner.settle(*open_settle).await;
            runner.launch_detached(&run_script.render()?).await?;
            runner.settle(*script_settle).await;
            Ok(())
        }
    }
}

async fn copy_asset(from: &Path, to: &Path) -> BumperResult<()> {
    if !from.is_file() {
        return Err(BumperError::missing_asset(from));
    }
    tokio::fs::copy(from, to).await?;
    Ok(())
}
