//! Batch driver: one workspace, events processed strictly one after another.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bumper_common::config::FinalizeConfig;
use bumper_common::error::{BumperError, BumperResult, ErrorKind};
use bumper_project_model::{Event, EventFilter, EventId, ProjectFolder, Selection};

use crate::controller::{JobResult, RenderController, RenderSettings};
use crate::dispatch::Dispatcher;
use crate::finalize::{FinalizeMethod, Finalizer};
use crate::job::JobKind;
use crate::runner::ProcessRunner;
use crate::workspace::Workspace;

/// Everything a batch needs besides the host integration.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub project: ProjectFolder,
    pub events: Vec<Event>,
    pub filter: EventFilter,
    pub settings: RenderSettings,
    pub finalize: FinalizeConfig,
    /// Create the workspace here instead of the system temp directory.
    pub workspace_base: Option<PathBuf>,
}

/// Progress callback for batch runs.
pub type ProgressCallback = Box<dyn Fn(BatchNotice) + Send + Sync>;

/// Operator-facing progress.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchNotice {
    Started { workspace: PathBuf },
    Enqueuing { jobs: usize },
    RoomSkipped { room: String, title: String },
    Event(BatchProgress),
    Finished { workspace: PathBuf },
}

/// Progress of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub id: EventId,
    pub title: String,
    pub stage: BatchStage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStage {
    Enqueued,
    AlreadyRendered { existing: PathBuf },
    NotEnqueued { reason: String },
    Finalizing,
    Finalized { kind: JobKind, path: PathBuf },
    SkippingFinalize,
    Copied { path: PathBuf },
    FinalizeFailed { reason: String },
}

impl fmt::Display for BatchNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchNotice::Started { workspace } => write!(f, "working in {}", workspace.display()),
            BatchNotice::Enqueuing { jobs } => {
                let noun = if *jobs == 1 { "job" } else { "jobs" };
                write!(f, "enqueuing {jobs} {noun} into aerender")
            }
            BatchNotice::RoomSkipped { room, title } => write!(f, "skipping room {room} ({title})"),
            BatchNotice::Event(progress) => write!(f, "{progress}"),
            BatchNotice::Finished { workspace } => {
                write!(f, "all done, cleaning up {}", workspace.display())
            }
        }
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {} – ", self.id, self.title)?;
        match &self.stage {
            BatchStage::Enqueued => write!(f, "enqueued as {}", self.id),
            BatchStage::AlreadyRendered { existing } => {
                write!(f, "file exists, skipping {} ({})", self.id, existing.display())
            }
            BatchStage::NotEnqueued { reason } => write!(
                f,
                "job was not enqueued successfully, skipping postprocessing: {reason}"
            ),
            BatchStage::Finalizing => f.write_str("finalizing job"),
            BatchStage::Finalized { kind, path } => {
                let what = match kind {
                    JobKind::Ordinary => "intro".to_string(),
                    JobKind::Reserved(job) => job.token().to_string(),
                };
                write!(f, "finalized {what} to {}", path.display())
            }
            BatchStage::SkippingFinalize => f.write_str("skipping finalizing job"),
            BatchStage::Copied { path } => {
                write!(f, "copied intermediate clip to {}", path.display())
            }
            BatchStage::FinalizeFailed { reason } => write!(f, "finalizing failed: {reason}"),
        }
    }
}

/// Where in the pipeline a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Render,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Delivered {
        path: PathBuf,
        method: FinalizeMethod,
    },
    Skipped {
        existing: PathBuf,
    },
    Filtered {
        room: Option<String>,
    },
    Failed {
        stage: FailedStage,
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOutcome {
    pub id: EventId,
    pub title: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// What happened to every event of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workspace: PathBuf,
    pub outcomes: Vec<EventOutcome>,
}

impl BatchReport {
    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Delivered { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn filtered(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Filtered { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    pub fn outcome(&self, id: EventId) -> Option<&OutcomeStatus> {
        self.outcomes.iter().find(|o| o.id == id).map(|o| &o.status)
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Render every selected event of `request`.
///
/// Per-event failures are recorded in the report and never abort the batch.
/// Only failing to create the workspace is returned as an error. The
/// workspace is removed before returning.
pub async fn run_batch(
    request: BatchRequest,
    dispatcher: &dyn Dispatcher,
    runner: &dyn ProcessRunner,
    progress: Option<ProgressCallback>,
) -> BumperResult<BatchReport> {
    let started_at = Utc::now();
    let workspace = match &request.workspace_base {
        Some(base) => Workspace::create_in(base)?,
        None => Workspace::create()?,
    };
    let workspace_path = workspace.path().to_path_buf();

    let notify = |notice: BatchNotice| {
        if let Some(cb) = &progress {
            cb(notice);
        }
    };

    tracing::info!(
        workspace = %workspace_path.display(),
        events = request.events.len(),
        host = %dispatcher.host(),
        "Starting batch"
    );
    notify(BatchNotice::Started {
        workspace: workspace_path.clone(),
    });

    let selection = request.filter.apply(request.events);
    notify(BatchNotice::Enqueuing {
        jobs: selection.len(),
    });

    let mut outcomes = Vec::with_capacity(selection.len());
    {
        let controller = RenderController::new(
            &request.project,
            &workspace,
            dispatcher,
            runner,
            Finalizer::new(request.finalize.clone()),
            request.settings,
        );

        for (event, verdict) in &selection.entries {
            let status = match verdict {
                Selection::Selected => process_event(&controller, event, &notify).await,
                Selection::Excluded => continue,
                Selection::RoomMismatch => {
                    let room = event.room().map(str::to_string);
                    tracing::info!(event_id = %event.id, room = ?room, "Skipping room");
                    notify(BatchNotice::RoomSkipped {
                        room: room.clone().unwrap_or_else(|| "(none)".to_string()),
                        title: event.title.clone(),
                    });
                    OutcomeStatus::Filtered { room }
                }
            };
            outcomes.push(EventOutcome {
                id: event.id,
                title: event.title.clone(),
                status,
            });
        }
    }

    notify(BatchNotice::Finished {
        workspace: workspace_path.clone(),
    });
    if let Err(err) = workspace.close() {
        tracing::warn!(workspace = %workspace_path.display(), error = %err, "Failed to remove workspace");
    }

    let report = BatchReport {
        started_at,
        finished_at: Utc::now(),
        workspace: workspace_path,
        outcomes,
    };
    tracing::info!(
        delivered = report.delivered(),
        skipped = report.skipped(),
        filtered = report.filtered(),
        failed = report.failed(),
        elapsed_secs = report.duration_secs(),
        "Batch complete"
    );
    Ok(report)
}

async fn process_event(
    controller: &RenderController<'_>,
    event: &Event,
    notify: &impl Fn(BatchNotice),
) -> OutcomeStatus {
    let emit = |stage: BatchStage| {
        notify(BatchNotice::Event(BatchProgress {
            id: event.id,
            title: event.title.clone(),
            stage,
        }))
    };

    emit(BatchStage::Enqueued);
    let mut job = match controller.admit_and_run(event).await {
        JobResult::Rendered(job) => job,
        JobResult::Skipped { existing } => {
            emit(BatchStage::AlreadyRendered {
                existing: existing.clone(),
            });
            return OutcomeStatus::Skipped { existing };
        }
        JobResult::Failed { error, .. } => {
            emit(BatchStage::NotEnqueued {
                reason: error.to_string(),
            });
            return failed(FailedStage::Render, &error);
        }
    };

    let finalize = controller.settings().finalize;
    emit(if finalize {
        BatchStage::Finalizing
    } else {
        BatchStage::SkippingFinalize
    });

    match controller.finalize(&mut job).await {
        Ok(delivery) => {
            emit(if finalize {
                BatchStage::Finalized {
                    kind: job.kind,
                    path: delivery.path.clone(),
                }
            } else {
                BatchStage::Copied {
                    path: delivery.path.clone(),
                }
            });
            OutcomeStatus::Delivered {
                path: delivery.path,
                method: delivery.method,
            }
        }
        Err(error) => {
            emit(BatchStage::FinalizeFailed {
                reason: error.to_string(),
            });
            failed(FailedStage::Finalize, &error)
        }
    }
}

fn failed(stage: FailedStage, error: &BumperError) -> OutcomeStatus {
    OutcomeStatus::Failed {
        stage,
        kind: error.kind(),
        message: error.to_string(),
    }
}
