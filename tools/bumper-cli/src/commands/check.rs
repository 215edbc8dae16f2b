//! Check renderer, transcoder and project assets.

use std::path::PathBuf;

use bumper_common::config::AppConfig;
use bumper_platform_core::HostPlatform;
use bumper_project_model::ProjectFolder;
use bumper_render_engine::{Dispatcher, Finalizer, HostDispatcher};

pub fn run(project: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<()> {
    println!("Bumper System Check");
    println!("{}", "=".repeat(50));

    let host = HostPlatform::detect();
    let dispatcher = HostDispatcher::select(host.clone(), &config.renderer);
    let mut ready = true;

    if dispatcher.is_supported() {
        println!("[OK] Host platform: {host}");
    } else {
        println!("[FAIL] Host platform: {host} (rendering needs macOS or Windows)");
        ready = false;
    }

    for tool in dispatcher.probe() {
        println!("{} {}", marker(tool.available), tool.name);
        ready &= tool.available;
    }

    let finalizer = Finalizer::new(config.finalize.clone());
    let ffmpeg = finalizer.is_available();
    println!("{} Transcoder: {}", marker(ffmpeg), config.finalize.ffmpeg);
    if !ffmpeg {
        println!("     only --no-finalize runs will work");
    }

    if let Some(path) = project {
        let project = ProjectFolder::open(&path)?;
        println!();
        println!("Project: {}", project.root().display());
        println!("Deliveries: {}", project.delivery_dir().display());
        for (asset, present) in project.asset_inventory() {
            println!("{} {asset}", if present { "[OK]  " } else { "[MISS]" });
        }
    }

    println!();
    if ready {
        println!("Renderer is available. Bumper is ready.");
    } else {
        println!("Renderer is not available. See above for what is missing.");
    }

    Ok(())
}

fn marker(available: bool) -> &'static str {
    if available {
        "[OK]"
    } else {
        "[FAIL]"
    }
}
