//! Configuration management (`<config dir>/frame-audio/config.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::buffer::AudioStreamConfig;
use crate::constants::*;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub video: VideoSettings,
    #[serde(default)]
    pub frame: FrameSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_sample_rate")]
    pub samples_per_second: u32,
    #[serde(default = "default_tone_hz")]
    pub tone_hz: u32,
    #[serde(default = "default_tone_volume")]
    pub tone_volume: i16,
    /// Latency lead is `samples_per_second / latency_divisor` samples
    #[serde(default = "default_latency_divisor")]
    pub latency_divisor: u32,
    /// Backends to try, in order
    #[serde(default = "default_backends")]
    pub backends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSettings {
    /// Sleep to hold this frame rate. Unset runs as fast as possible.
    #[serde(default)]
    pub target_fps: Option<u32>,
    /// Stop after this many frames
    #[serde(default)]
    pub max_frames: Option<u64>,
}

fn default_sample_rate() -> u32 { DEFAULT_SAMPLE_RATE }
fn default_tone_hz() -> u32 { DEFAULT_TONE_HZ }
fn default_tone_volume() -> i16 { DEFAULT_TONE_VOLUME }
fn default_latency_divisor() -> u32 { DEFAULT_LATENCY_DIVISOR }
fn default_backends() -> Vec<String> { vec!["cpal".to_string(), "null".to_string()] }
fn default_width() -> usize { DEFAULT_WIDTH }
fn default_height() -> usize { DEFAULT_HEIGHT }

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            samples_per_second: default_sample_rate(),
            tone_hz: default_tone_hz(),
            tone_volume: default_tone_volume(),
            latency_divisor: default_latency_divisor(),
            backends: default_backends(),
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl AppConfig {
    /// Stream geometry derived from the audio settings
    pub fn stream_config(&self) -> Result<AudioStreamConfig> {
        AudioStreamConfig::stereo_16bit(self.audio.samples_per_second, self.audio.latency_divisor)
    }

    /// Check everything that can be checked before opening devices.
    pub fn validate(&self) -> Result<()> {
        self.stream_config()?;
        if self.video.width == 0 || self.video.height == 0 {
            return Err(Error::Config(format!(
                "video size {}x{} is empty",
                self.video.width, self.video.height
            )));
        }
        if self.frame.target_fps == Some(0) {
            return Err(Error::Config("target fps must be non-zero".into()));
        }
        Ok(())
    }
}

pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "frame-audio", "frame-audio")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Parse and validate a config file.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// User config if present and valid, defaults otherwise.
pub fn load() -> AppConfig {
    let Some(path) = config_dir().map(|dir| dir.join("config.toml")) else {
        return AppConfig::default();
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}

pub fn save_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn save(config: &AppConfig) -> Result<()> {
    match config_dir() {
        Some(dir) => save_to(config, &dir.join("config.toml")),
        None => Err(Error::Config("no config directory on this platform".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.audio.samples_per_second, 48000);
        assert_eq!(config.audio.tone_hz, 256);
        assert_eq!(config.audio.tone_volume, 3000);
        assert_eq!(config.audio.backends, vec!["cpal", "null"]);
        assert_eq!((config.video.width, config.video.height), (1280, 720));
        assert_eq!(config.frame.target_fps, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stream_config_from_defaults() {
        let stream = AppConfig::default().stream_config().unwrap();
        assert_eq!(stream, AudioStreamConfig::default());
        assert_eq!(stream.latency_samples(), 3200);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [audio]
            tone_hz = 440
            backends = ["simulated"]

            [frame]
            target_fps = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.tone_hz, 440);
        assert_eq!(config.audio.samples_per_second, 48000);
        assert_eq!(config.audio.backends, vec!["simulated"]);
        assert_eq!(config.frame.target_fps, Some(30));
        assert_eq!(config.video, VideoSettings::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = AppConfig::default();
        config.audio.latency_divisor = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = AppConfig::default();
        config.video.width = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.frame.target_fps = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("frame-audio-test-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = AppConfig::default();
        config.audio.tone_hz = 300;
        config.frame.max_frames = Some(120);
        save_to(&config, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::write(&path, "[audio]\nsamples_per_second = \"fast\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(Error::Toml(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
