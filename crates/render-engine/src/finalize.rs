//! Finalize stage: intermediate clip to delivery artifact.
//!
//! The normal path transcodes to an MPEG-2 transport stream with ffmpeg.
//! With finalize disabled the intermediate clip is copied as is. Either way
//! the artifact is written under a `.partial` name and renamed into place,
//! so the delivery path only ever holds a complete file.

use std::path::{Path, PathBuf};

use bumper_common::config::FinalizeConfig;
use bumper_common::error::{BumperError, BumperResult};
use bumper_platform_core::{executable_available, CommandSpec, CommandTemplate};
use serde::Serialize;

use crate::runner::ProcessRunner;

/// Broadcast delivery encoding: MPEG-2 video, MP2 audio, transport stream.
pub const TRANSCODE_TEMPLATE: &str = "{ffmpeg} -y -hide_banner -loglevel error -i {input} \
     -map 0:0 -c:v mpeg2video -q:v {quality} -aspect {aspect} \
     -map 0:1 -c:a mp2 -b:a {audio_bitrate} -shortest -f mpegts {output}";

const PARTIAL_SUFFIX: &str = "partial";

/// How a delivery artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeMethod {
    Transcoded,
    Copied,
}

/// A delivery artifact in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalDelivery {
    pub path: PathBuf,
    pub method: FinalizeMethod,
}

#[derive(Debug, Clone, Default)]
pub struct Finalizer {
    config: FinalizeConfig,
}

impl Finalizer {
    pub fn new(config: FinalizeConfig) -> Self {
        Self { config }
    }

    /// Whether the configured transcoder can be launched.
    pub fn is_available(&self) -> bool {
        executable_available(&self.config.ffmpeg)
    }

    /// Transcoder invocation reading `input` and writing `output`.
    pub fn transcode_command(&self, input: &Path, output: &Path) -> CommandSpec {
        CommandTemplate::new(TRANSCODE_TEMPLATE)
            .bind("ffmpeg", &self.config.ffmpeg)
            .bind("quality", self.config.video_quality.to_string())
            .bind("aspect", &self.config.aspect)
            .bind("audio_bitrate", &self.config.audio_bitrate)
            .bind_path("input", input)
            .bind_path("output", output)
    }

    /// Transcode `input` to `delivery`.
    pub async fn transcode(
        &self,
        runner: &dyn ProcessRunner,
        input: &Path,
        delivery: &Path,
    ) -> BumperResult<FinalDelivery> {
        ensure_input(input)?;
        let partial = partial_path(delivery);
        let command = self.transcode_command(input, &partial).render()?;

        if let Err(err) = runner.run(&command).await {
            discard_partial(&partial).await;
            return Err(err);
        }
        if !partial.is_file() {
            return Err(BumperError::external_tool(
                command.tool_name(),
                format!("no output written to {}", partial.display()),
            ));
        }
        promote(&partial, delivery).await?;
        tracing::info!(input = %input.display(), output = %delivery.display(), "Transcoded");
        Ok(FinalDelivery {
            path: delivery.to_path_buf(),
            method: FinalizeMethod::Transcoded,
        })
    }

    /// Copy `input` to `delivery` without transcoding.
    pub async fn copy_verbatim(&self, input: &Path, delivery: &Path) -> BumperResult<FinalDelivery> {
        ensure_input(input)?;
        let partial = partial_path(delivery);
        if let Err(err) = tokio::fs::copy(input, &partial).await {
            discard_partial(&partial).await;
            return Err(err.into());
        }
        promote(&partial, delivery).await?;
        tracing::info!(input = %input.display(), output = %delivery.display(), "Copied intermediate clip");
        Ok(FinalDelivery {
            path: delivery.to_path_buf(),
            method: FinalizeMethod::Copied,
        })
    }
}

fn ensure_input(input: &Path) -> BumperResult<()> {
    if input.is_file() {
        Ok(())
    } else {
        Err(BumperError::external_tool(
            "aerender",
            format!("intermediate clip {} was not produced", input.display()),
        ))
    }
}

/// `<dir>/<name>.partial.<ext>`, keeping the extension so ffmpeg infers nothing odd.
fn partial_path(delivery: &Path) -> PathBuf {
    let stem = delivery
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match delivery.extension() {
        Some(ext) => format!("{stem}.{PARTIAL_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{PARTIAL_SUFFIX}"),
    };
    delivery.with_file_name(name)
}

async fn promote(partial: &Path, delivery: &Path) -> BumperResult<()> {
    if let Err(err) = tokio::fs::rename(partial, delivery).await {
        discard_partial(partial).await;
        return Err(err.into());
    }
    Ok(())
}

async fn discard_partial(partial: &Path) {
    if let Err(err) = tokio::fs::remove_file(partial).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %partial.display(), error = %err, "Failed to remove partial delivery");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use bumper_common::error::ErrorKind;
    use bumper_platform_core::CommandLine;

    /// Writes the last argument like ffmpeg would, or fails after a partial write.
    struct FakeFfmpeg {
        fail: bool,
        seen: Mutex<Vec<CommandLine>>,
    }

    #[async_trait::async_trait]
    impl ProcessRunner for FakeFfmpeg {
        async fn run(&self, command: &CommandLine) -> BumperResult<()> {
            self.seen.lock().unwrap().push(command.clone());
            let output = command.args.last().unwrap();
            std::fs::write(output, b"ts").unwrap();
            if self.fail {
                return Err(BumperError::external_tool("ffmpeg", "exit status: 1"));
            }
            Ok(())
        }

        async fn launch_detached(&self, _command: &CommandLine) -> BumperResult<()> {
            Ok(())
        }

        async fn settle(&self, _duration: Duration) {}
    }

    fn fake(fail: bool) -> FakeFfmpeg {
        FakeFfmpeg {
            fail,
            seen: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_transcode_arguments() {
        let line = Finalizer::default()
            .transcode_command(Path::new("/w/1.mov"), Path::new("/out/1.ts"))
            .render()
            .unwrap();
        assert_eq!(line.program, "ffmpeg");
        assert_eq!(
            line.args.join(" "),
            "-y -hide_banner -loglevel error -i /w/1.mov -map 0:0 -c:v mpeg2video -q:v 2 \
             -aspect 16:9 -map 0:1 -c:a mp2 -b:a 384k -shortest -f mpegts /out/1.ts"
        );
    }

    #[test]
    fn test_partial_path_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("/out/pause.ts")),
            PathBuf::from("/out/pause.partial.ts")
        );
    }

    #[tokio::test]
    async fn test_transcode_promotes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("7.mov");
        let delivery = dir.path().join("7.ts");
        std::fs::write(&input, b"mov").unwrap();

        let runner = fake(false);
        let result = Finalizer::default()
            .transcode(&runner, &input, &delivery)
            .await
            .unwrap();

        assert_eq!(result.method, FinalizeMethod::Transcoded);
        assert!(delivery.is_file());
        assert!(!dir.path().join("7.partial.ts").exists());
        assert_eq!(runner.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_transcode_leaves_no_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("7.mov");
        let delivery = dir.path().join("7.ts");
        std::fs::write(&input, b"mov").unwrap();

        let err = Finalizer::default()
            .transcode(&fake(true), &input, &delivery)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExternalToolFailure);
        assert!(!delivery.exists());
        assert!(!dir.path().join("7.partial.ts").exists());
    }

    #[tokio::test]
    async fn test_missing_intermediate_is_not_transcoded() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake(false);
        let err = Finalizer::default()
            .transcode(&runner, &dir.path().join("1.mov"), &dir.path().join("1.ts"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalToolFailure);
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copy_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("outro.avi");
        let delivery = dir.path().join("out").join("outro.avi");
        std::fs::create_dir_all(delivery.parent().unwrap()).unwrap();
        std::fs::write(&input, b"avi-bytes").unwrap();

        let result = Finalizer::default().copy_verbatim(&input, &delivery).await.unwrap();
        assert_eq!(result.method, FinalizeMethod::Copied);
        assert_eq!(std::fs::read(&delivery).unwrap(), b"avi-bytes");
    }
}
