//! macOS renderer integration.
//!
//! On macOS the rendering application cannot be scripted headless. Edits are
//! applied through an AppleScript bridge (`intro.scpt`) run by `osascript`,
//! which opens the working document, runs the generated script inside the
//! application and saves. Rendering itself goes through `aerender`.

use std::path::PathBuf;

use bumper_common::config::RendererConfig;
use bumper_platform_core::{executable_available, CommandSpec, CommandTemplate};
use serde::Serialize;

/// `aerender` invocation writing one composition to a clip.
pub const RENDER_TEMPLATE: &str =
    "{aerender} -project {jobpath} -comp {comp} -output {locationpath}";

/// Automation bridge: `<runner> <bridge script> <working document> <generated script>`.
pub const AUTOMATION_BRIDGE_TEMPLATE: &str = "{runner} {ascript_path} {jobpath} {scriptpath}";

/// Container `aerender` writes with the default output module on macOS.
pub const INTERMEDIATE_EXTENSION: &str = "mov";

/// Location of the rendering application on a macOS host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacInstall {
    install_dir: PathBuf,
    automation_runner: String,
}

/// What a capability check found on this host.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MacRendererSupport {
    pub aerender: bool,
    pub automation_runner: bool,
}

impl MacInstall {
    pub fn new(install_dir: impl Into<PathBuf>, automation_runner: impl Into<String>) -> Self {
        Self {
            install_dir: install_dir.into(),
            automation_runner: automation_runner.into(),
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(&config.macos_install_dir, &config.automation_runner)
    }

    pub fn aerender(&self) -> PathBuf {
        self.install_dir.join("aerender")
    }

    /// Render template with the `aerender` path bound.
    /// Callers bind `jobpath`, `comp` and `locationpath`.
    pub fn render_command(&self) -> CommandSpec {
        CommandTemplate::new(RENDER_TEMPLATE).bind("aerender", self.aerender().to_string_lossy())
    }

    /// Bridge template with the runner bound.
    /// Callers bind `ascript_path`, `jobpath` and `scriptpath`.
    pub fn automation_bridge_command(&self) -> CommandSpec {
        CommandTemplate::new(AUTOMATION_BRIDGE_TEMPLATE).bind("runner", &self.automation_runner)
    }

    /// Check the renderer and the bridge runner are installed.
    pub fn probe(&self) -> MacRendererSupport {
        let support = MacRendererSupport {
            aerender: self.aerender().is_file(),
            automation_runner: executable_available(&self.automation_runner),
        };
        tracing::debug!(?support, install_dir = %self.install_dir.display(), "Probed macOS renderer");
        support
    }
}
