//! Bumper Render Engine
//!
//! Drives an external rendering application to produce one bumper clip per
//! event, then transcodes each clip into the broadcast delivery container.
//!
//! # Pipeline
//!
//! ```text
//! events ── EventFilter ──┐
//!                         ▼
//!               RenderController::admit_and_run
//!                 │  skip if <parent>/<id>.{ts,mov} exists
//!                 ▼
//!               Dispatcher::plan ── expand intro.jsx, copy assets,
//!                 │                 apply edits, aerender
//!                 ▼
//!               Workspace/<id>.{mov,avi}
//!                 │
//!                 ▼
//!               RenderController::finalize ── ffmpeg (or copy)
//!                 │
//!                 ▼
//!               <parent>/<id>.ts
//! ```
//!
//! Events run strictly in sequence. A failing event is reported and the
//! batch moves on.

pub mod batch;
pub mod controller;
pub mod dispatch;
pub mod finalize;
pub mod job;
pub mod runner;
pub mod script;
pub mod workspace;

pub use batch::{
    run_batch, BatchNotice, BatchReport, BatchRequest, EventOutcome, OutcomeStatus,
    ProgressCallback,
};
pub use controller::{JobResult, RenderController, RenderSettings};
pub use dispatch::{Dispatcher, HostDispatcher};
pub use finalize::{FinalDelivery, FinalizeMethod, Finalizer};
pub use runner::{ProcessRunner, SystemRunner};
pub use workspace::Workspace;
