//! Render a batch.

use std::future::Future;
use std::path::PathBuf;

use bumper_common::config::AppConfig;
use bumper_common::error::{BumperError, BumperResult};
use bumper_project_model::{load_events, Event, EventFilter, EventId, ProjectFolder, ReservedJob};
use bumper_render_engine::batch::OutcomeStatus;
use bumper_render_engine::{
    run_batch, BatchNotice, BatchRequest, HostDispatcher, RenderSettings, SystemRunner,
};

pub struct RenderArgs {
    pub project: PathBuf,
    pub schedule: Option<PathBuf>,
    pub debug: bool,
    pub pause: bool,
    pub outro: bool,
    pub bgloop: bool,
    pub ids: Vec<EventId>,
    pub rooms: Vec<String>,
    pub force: bool,
    pub no_finalize: bool,
    pub output_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

/// Where the batch's events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Schedule(PathBuf),
    Debug,
    Reserved(ReservedJob),
}

impl RunMode {
    pub fn events(&self) -> BumperResult<Vec<Event>> {
        match self {
            RunMode::Schedule(path) => {
                load_events(path).map_err(|e| BumperError::config(e.to_string()))
            }
            RunMode::Debug => Ok(vec![Event::placeholder()]),
            RunMode::Reserved(job) => Ok(vec![Event::reserved(*job)]),
        }
    }
}

/// Exactly one event source must be selected.
pub fn resolve_mode(args: &RenderArgs) -> BumperResult<RunMode> {
    let mut synthesized = Vec::new();
    if args.debug {
        synthesized.push(RunMode::Debug);
    }
    for (flag, job) in [
        (args.pause, ReservedJob::Pause),
        (args.outro, ReservedJob::Outro),
        (args.bgloop, ReservedJob::Bgloop),
    ] {
        if flag {
            synthesized.push(RunMode::Reserved(job));
        }
    }

    if args.debug && (!args.ids.is_empty() || !args.rooms.is_empty()) {
        return Err(BumperError::config(
            "--debug renders a placeholder event and cannot be combined with --id or --room",
        ));
    }
    if synthesized.len() > 1 {
        return Err(BumperError::config(
            "only one of --debug, --pause, --outro and --bgloop may be given",
        ));
    }

    match (synthesized.pop(), &args.schedule) {
        (Some(_), Some(schedule)) => Err(BumperError::config(format!(
            "schedule {} cannot be combined with --debug, --pause, --outro or --bgloop",
            schedule.display()
        ))),
        (Some(mode), None) => Ok(mode),
        (None, Some(schedule)) => Ok(RunMode::Schedule(schedule.clone())),
        (None, None) => Err(BumperError::config(
            "a schedule is required unless --debug, --pause, --outro or --bgloop is given",
        )),
    }
}

pub async fn run(args: RenderArgs, config: &AppConfig) -> anyhow::Result<()> {
    let mode = resolve_mode(&args)?;
    let events = mode.events()?;

    let mut project =
        ProjectFolder::open(&args.project).map_err(|e| BumperError::config(e.to_string()))?;
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
        project = project.with_delivery_dir(dir);
    }

    let dispatcher = HostDispatcher::for_current_host(&config.renderer);
    if !dispatcher.is_supported() {
        println!(
            "[WARN] no render path for this host ({}); every job will fail",
            bumper_platform_core::HostPlatform::detect()
        );
    }

    tracing::info!(mode = ?mode, events = events.len(), project = %args.project.display(), "Render requested");

    let request = BatchRequest {
        project,
        events,
        filter: EventFilter::new(args.ids, args.rooms),
        settings: RenderSettings {
            force: args.force,
            finalize: !args.no_finalize,
        },
        finalize: config.finalize.clone(),
        workspace_base: None,
    };

    let progress: bumper_render_engine::ProgressCallback =
        Box::new(|notice: BatchNotice| println!("{notice}"));

    let runner = SystemRunner::new();
    let report = until_interrupted(
        run_batch(request, &dispatcher, &runner, Some(progress)),
        tokio::signal::ctrl_c(),
    )
    .await?;

    println!();
    println!(
        "{} delivered, {} skipped, {} filtered, {} failed in {:.1}s",
        report.delivered(),
        report.skipped(),
        report.filtered(),
        report.failed(),
        report.duration_secs()
    );
    for outcome in &report.outcomes {
        if let OutcomeStatus::Failed { kind, message, .. } = &outcome.status {
            println!("  #{} {}: [{kind}] {message}", outcome.id, outcome.title);
        }
    }

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Drive `batch` until it completes or `interrupt` fires.
///
/// On interrupt the batch future is dropped, which kills the running tool
/// and removes the workspace.
pub async fn until_interrupted<T>(
    batch: impl Future<Output = BumperResult<T>>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> anyhow::Result<T> {
    tokio::select! {
        result = batch => return Ok(result?),
        Ok(()) = interrupt => {}
    }
    tracing::warn!("Batch interrupted, workspace removed");
    anyhow::bail!("render interrupted")
}
