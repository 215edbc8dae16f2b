//! Launching external tools.
//!
//! Everything the pipeline executes goes through [`ProcessRunner`], so a
//! batch can be driven against a recording fake in tests.

use std::process::Stdio;
use std::time::{Duration, Instant};

use bumper_common::error::{BumperError, BumperResult};
use bumper_platform_core::CommandLine;
use tokio::process::Command;

/// Longest stderr excerpt carried in a failure message.
const STDERR_TAIL_BYTES: usize = 2048;

/// Executes rendered command lines.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion with output discarded. Non-zero exit is an
    /// `ExternalTool` error. Dropping the future kills the process.
    async fn run(&self, command: &CommandLine) -> BumperResult<()>;

    /// Start without waiting for exit.
    async fn launch_detached(&self, command: &CommandLine) -> BumperResult<()>;

    /// Block for a fixed interval after a detached launch.
    async fn settle(&self, duration: Duration);
}

/// Runs real processes on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> BumperResult<()> {
        let tool = command.tool_name();
        tracing::debug!(%tool, command = %command, "Running external tool");
        let started = Instant::now();

        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BumperError::external_tool(&tool, format!("failed to start: {e}")))?;

        tracing::debug!(
            %tool,
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "External tool exited"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BumperError::external_tool(
                tool,
                format!("{} ({})", output.status, stderr_tail(stderr.trim())),
            ));
        }
        Ok(())
    }

    async fn launch_detached(&self, command: &CommandLine) -> BumperResult<()> {
        let tool = command.tool_name();
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(windows)]
        cmd.creation_flags(bumper_platform_windows::DETACHED_PROCESS);

        let child = cmd
            .spawn()
            .map_err(|e| BumperError::external_tool(&tool, format!("failed to start: {e}")))?;
        tracing::info!(%tool, pid = child.id(), command = %command, "Launched detached");
        Ok(())
    }

    async fn settle(&self, duration: Duration) {
        tracing::debug!(secs = duration.as_secs_f64(), "Waiting for renderer to settle");
        tokio::time::sleep(duration).await;
    }
}

fn stderr_tail(stderr: &str) -> &str {
    if stderr.is_empty() {
        return "no output";
    }
    if stderr.len() <= STDERR_TAIL_BYTES {
        return stderr;
    }
    let mut start = stderr.len() - STDERR_TAIL_BYTES;
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    &stderr[start..]
}
