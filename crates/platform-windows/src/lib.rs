//! Windows renderer integration.
//!
//! On Windows the rendering application accepts `-noui` and `-r <script>`,
//! so edits are applied by launching it headless against the working
//! document and then against the generated script. Neither launch reports
//! readiness, so callers wait fixed settle intervals after each.

use std::path::PathBuf;

use bumper_common::config::RendererConfig;
use bumper_platform_core::{CommandSpec, CommandTemplate};
use serde::Serialize;

/// `CreateProcess` flag: the child gets no console and outlives the caller's.
pub const DETACHED_PROCESS: u32 = 0x0000_0008;

/// `aerender.exe` invocation writing one composition to a clip.
pub const RENDER_TEMPLATE: &str =
    "{aerender} -project {jobpath} -comp {comp} -output {locationpath}";

/// Open the working document headless.
pub const OPEN_PROJECT_TEMPLATE: &str = "{afterfx} -noui {jobpath}";

/// Run the generated script headless against the open document.
pub const RUN_SCRIPT_TEMPLATE: &str = "{afterfx} -noui -r {scriptpath}";

/// Container `aerender.exe` writes with the default output module on Windows.
pub const INTERMEDIATE_EXTENSION: &str = "avi";

/// Location of the rendering application on a Windows host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsInstall {
    install_dir: PathBuf,
}

/// What a capability check found on this host.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowsRendererSupport {
    pub aerender: bool,
    pub afterfx: bool,
}

impl WindowsInstall {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(&config.windows_install_dir)
    }

    fn support_files(&self) -> PathBuf {
        self.install_dir.join("Support Files")
    }

    pub fn aerender(&self) -> PathBuf {
        self.support_files().join("aerender.exe")
    }

    pub fn afterfx(&self) -> PathBuf {
        self.support_files().join("AfterFX.exe")
    }

    /// Callers bind `jobpath`, `comp` and `locationpath`.
    pub fn render_command(&self) -> CommandSpec {
        CommandTemplate::new(RENDER_TEMPLATE).bind("aerender", self.aerender().to_string_lossy())
    }

    /// Callers bind `jobpath`.
    pub fn open_project_command(&self) -> CommandSpec {
        CommandTemplate::new(OPEN_PROJECT_TEMPLATE)
            .bind("afterfx", self.afterfx().to_string_lossy())
    }

    /// Callers bind `scriptpath`.
    pub fn run_script_command(&self) -> CommandSpec {
        CommandTemplate::new(RUN_SCRIPT_TEMPLATE).bind("afterfx", self.afterfx().to_string_lossy())
    }

    pub fn probe(&self) -> WindowsRendererSupport {
        let support = WindowsRendererSupport {
            aerender: self.aerender().is_file(),
            afterfx: self.afterfx().is_file(),
        };
        tracing::debug!(?support, install_dir = %self.install_dir.display(), "Probed Windows renderer");
        support
    }
}
