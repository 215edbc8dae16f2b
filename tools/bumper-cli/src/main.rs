//! Bumper CLI: render per-talk intro clips and fixed pause/outro loops.
//!
//! Usage:
//!   bumper render <PROJECT> [SCHEDULE]   Render a batch
//!   bumper check <PROJECT>               Check renderer, transcoder and assets
//!   bumper config [--init]               Show or create the config file

use std::path::PathBuf;

use bumper_project_model::EventId;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "bumper",
    about = "Render conference intro, pause and outro clips with After Effects",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render clips for a schedule, a preview event or a reserved loop
    Render {
        /// Project folder containing intro.aep, intro.jsx, intro.scpt and the loop projects
        project: PathBuf,

        /// Event file (JSON array) exported from the conference schedule
        schedule: Option<PathBuf>,

        /// Render a single placeholder event instead of a schedule
        #[arg(long)]
        debug: bool,

        /// Render pause.aep instead of a schedule
        #[arg(long)]
        pause: bool,

        /// Render outro.aep instead of a schedule
        #[arg(long)]
        outro: bool,

        /// Render bgloop.aep instead of a schedule
        #[arg(long)]
        bgloop: bool,

        /// Only render the given event id(s)
        #[arg(long = "id", num_args = 1..)]
        ids: Vec<EventId>,

        /// Only render the given room(s)
        #[arg(long = "room", num_args = 1..)]
        rooms: Vec<String>,

        /// Render even if the delivery file already exists
        #[arg(long)]
        force: bool,

        /// Copy the intermediate clip instead of transcoding it
        #[arg(long)]
        no_finalize: bool,

        /// Write deliveries into this directory instead of the project's parent
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check renderer, transcoder and project assets
    Check {
        /// Project folder to inspect
        project: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration if no config file exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = bumper_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    bumper_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Render {
            project,
            schedule,
            debug,
            pause,
            outro,
            bgloop,
            ids,
            rooms,
            force,
            no_finalize,
            output_dir,
            report,
        } => {
            let args = commands::render::RenderArgs {
                project,
                schedule,
                debug,
                pause,
                outro,
                bgloop,
                ids,
                rooms,
                force,
                no_finalize,
                output_dir,
                report,
            };
            commands::render::run(args, &config).await
        }
        Commands::Check { project } => commands::check::run(project, &config),
        Commands::Config { init } => commands::config::run(init, &config),
    }
}
