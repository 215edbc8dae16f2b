//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the rendering application lives on each host.
    pub renderer: RendererConfig,

    /// Transcoder settings for the finalize stage.
    pub finalize: FinalizeConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Rendering application install locations and handshake timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Install directory on macOS (contains `aerender`).
    pub macos_install_dir: PathBuf,

    /// Install directory on Windows (contains `Support Files/`).
    pub windows_install_dir: PathBuf,

    /// Automation-script runner used as the macOS bridge.
    pub automation_runner: String,

    /// Wait after opening the working document headless.
    pub open_settle_secs: u64,

    /// Wait after launching the generated script headless.
    pub script_settle_secs: u64,
}

/// Transcoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    /// Transcoder executable (name on PATH or absolute path).
    pub ffmpeg: String,

    /// MPEG-2 video quantizer.
    pub video_quality: u32,

    /// MP2 audio bitrate, ffmpeg syntax.
    pub audio_bitrate: String,

    /// Display aspect ratio.
    pub aspect: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "bumper_render_engine=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            macos_install_dir: PathBuf::from("/Applications/Adobe After Effects CC 2019"),
            windows_install_dir: PathBuf::from(
                "C:/Program Files/Adobe/Adobe After Effects CC 2019",
            ),
            automation_runner: "osascript".to_string(),
            open_settle_secs: 15,
            script_settle_secs: 5,
        }
    }
}

impl RendererConfig {
    pub fn open_settle(&self) -> Duration {
        Duration::from_secs(self.open_settle_secs)
    }

    pub fn script_settle(&self) -> Duration {
        Duration::from_secs(self.script_settle_secs)
    }
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            video_quality: 2,
            audio_bitrate: "384k".to_string(),
            aspect: "16:9".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("bumper").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handshake_intervals() {
        let config = AppConfig::default();
        assert_eq!(config.renderer.open_settle(), Duration::from_secs(15));
        assert_eq!(config.renderer.script_settle(), Duration::from_secs(5));
        assert_eq!(config.renderer.automation_runner, "osascript");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "finalize": { "ffmpeg": "/opt/ffmpeg/bin/ffmpeg" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.finalize.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.finalize.audio_bitrate, "384k");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.renderer.open_settle_secs, 15);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = AppConfig::load_from(std::path::Path::new(
            "/definitely/not/here/bumper/config.json",
        ));
        assert_eq!(config.finalize.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_load_from_invalid_file_uses_defaults() {
        let dir = std::env::temp_dir().join("bumper_test_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.renderer.script_settle_secs, 5);

        std::fs::remove_dir_all(&dir).ok();
    }
}
