// SPDX-License-Identifier: MPL-2.0
//! Player configuration stored in `settings.toml`.
//!
//! # Configuration Sections
//!
//! - `[playback]` - Blending, pacing, looping and tick rate
//! - `[audio]` - Output volume and mute
//! - `[display]` - Window settings
//! - `[buffers]` - Channel capacities between demuxer and playback core
//!
//! Every field is optional; missing values fall back to [`defaults`].
//! Command-line flags are applied on top of the loaded file.
//!
//! # Examples
//!
//! ```no_run
//! use lockstep::config;
//!
//! let (config, warning) = config::load();
//! if let Some(warning) = warning {
//!     eprintln!("{warning}");
//! }
//! println!("looping {} times", config.playback.loops());
//! ```

pub mod defaults;
pub mod paths;

pub use defaults::*;

use crate::domain::newtypes::volume_bounds;
use crate::domain::Volume;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "settings.toml";

// =============================================================================
// Section Structs
// =============================================================================

/// Playback behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Cross-fade between successive frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<bool>,

    /// Advance one frame per tick instead of following timecodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_timecodes: Option<bool>,

    /// Extra passes after the first one.
    #[serde(default = "default_loops", skip_serializing_if = "Option::is_none")]
    pub loops: Option<u32>,

    /// Tick at the display refresh rate instead of as fast as possible.
    #[serde(
        default = "default_sync_to_display",
        skip_serializing_if = "Option::is_none"
    )]
    pub sync_to_display: Option<bool>,

    /// Render tick rate when synchronized to the display.
    #[serde(
        default = "default_refresh_hz",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_hz: Option<u32>,
}

impl PlaybackConfig {
    #[must_use]
    pub fn loops(&self) -> u32 {
        self.loops.unwrap_or(DEFAULT_LOOPS)
    }

    /// Tick rate clamped into the supported range.
    #[must_use]
    pub fn refresh_hz(&self) -> u32 {
        self.refresh_hz
            .unwrap_or(DEFAULT_REFRESH_HZ)
            .clamp(MIN_REFRESH_HZ, MAX_REFRESH_HZ)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            blend: Some(false),
            ignore_timecodes: Some(false),
            loops: default_loops(),
            sync_to_display: default_sync_to_display(),
            refresh_hz: default_refresh_hz(),
        }
    }
}

/// Audio output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Output volume (0.0 to 1.5).
    #[serde(default = "default_volume", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

impl AudioConfig {
    #[must_use]
    pub fn volume(&self) -> Volume {
        self.volume.map(Volume::new).unwrap_or_default()
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            muted: Some(false),
        }
    }
}

/// Window settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
}

/// Channel capacities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferConfig {
    /// Decoded frames held between demuxer and video tick.
    #[serde(
        default = "default_video_frames",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_frames: Option<usize>,

    /// Sample packets held between demuxer and audio callback.
    #[serde(
        default = "default_audio_packets",
        skip_serializing_if = "Option::is_none"
    )]
    pub audio_packets: Option<usize>,
}

impl BufferConfig {
    #[must_use]
    pub fn video_frames(&self) -> usize {
        self.video_frames
            .unwrap_or(DEFAULT_VIDEO_CHANNEL_CAPACITY)
            .clamp(MIN_CHANNEL_CAPACITY, MAX_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn audio_packets(&self) -> usize {
        self.audio_packets
            .unwrap_or(DEFAULT_AUDIO_CHANNEL_CAPACITY)
            .clamp(MIN_CHANNEL_CAPACITY, MAX_CHANNEL_CAPACITY)
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            video_frames: default_video_frames(),
            audio_packets: default_audio_packets(),
        }
    }
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

/// Player configuration with logical sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub buffers: BufferConfig,
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn default_loops() -> Option<u32> {
    Some(DEFAULT_LOOPS)
}

fn default_sync_to_display() -> Option<bool> {
    Some(true)
}

fn default_refresh_hz() -> Option<u32> {
    Some(DEFAULT_REFRESH_HZ)
}

fn default_volume() -> Option<f32> {
    Some(volume_bounds::DEFAULT)
}

fn default_video_frames() -> Option<usize> {
    Some(DEFAULT_VIDEO_CHANNEL_CAPACITY)
}

fn default_audio_packets() -> Option<usize> {
    Some(DEFAULT_AUDIO_CHANNEL_CAPACITY)
}

// =============================================================================
// Load / Save
// =============================================================================

fn config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    paths::config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

/// Loads the configuration from the resolved config directory.
///
/// Returns a tuple of (config, optional_warning). A missing file silently
/// yields the defaults; an unreadable or invalid one yields the defaults and
/// a warning explaining what went wrong.
#[must_use]
pub fn load() -> (Config, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from a custom directory.
#[must_use]
pub fn load_with_override(base_dir: Option<PathBuf>) -> (Config, Option<String>) {
    if let Some(path) = config_path_with_override(base_dir) {
        if path.exists() {
            return match load_from_path(&path) {
                Ok(config) => (config, None),
                Err(err) => (
                    Config::default(),
                    Some(format!(
                        "Ignoring {}: {err}. Using default settings.",
                        path.display()
                    )),
                ),
            };
        }
    }
    (Config::default(), None)
}

/// Loads configuration from a specific path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::{assert_abs_diff_eq, F32_EPSILON};
    use tempfile::tempdir;

    #[test]
    fn written_settings_load_back_unchanged() {
        let config = Config {
            playback: PlaybackConfig {
                blend: Some(true),
                ignore_timecodes: Some(false),
                loops: Some(3),
                sync_to_display: Some(false),
                refresh_hz: Some(144),
            },
            audio: AudioConfig {
                volume: Some(0.5),
                muted: Some(true),
            },
            display: DisplayConfig {
                fullscreen: Some(true),
            },
            buffers: BufferConfig {
                video_frames: Some(4),
                audio_packets: Some(16),
            },
        };
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        let content = toml::to_string_pretty(&config).expect("failed to serialize config");
        fs::write(&config_path, content).expect("failed to write config");

        let loaded = load_from_path(&config_path).expect("failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: Config = toml::from_str("[playback]\nblend = true\n").unwrap();
        assert_eq!(config.playback.blend, Some(true));
        assert_eq!(config.playback.loops(), DEFAULT_LOOPS);
        assert_eq!(config.playback.refresh_hz(), DEFAULT_REFRESH_HZ);
        assert_eq!(config.buffers, BufferConfig::default());
        assert_abs_diff_eq!(
            config.audio.volume().value(),
            volume_bounds::DEFAULT,
            epsilon = F32_EPSILON
        );
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config: Config = toml::from_str(
            "[playback]\nrefresh_hz = 0\n[audio]\nvolume = 4.0\n[buffers]\nvideo_frames = 0\naudio_packets = 100000\n",
        )
        .unwrap();

        assert_eq!(config.playback.refresh_hz(), MIN_REFRESH_HZ);
        assert_abs_diff_eq!(
            config.audio.volume().value(),
            volume_bounds::MAX,
            epsilon = F32_EPSILON
        );
        assert_eq!(config.buffers.video_frames(), MIN_CHANNEL_CAPACITY);
        assert_eq!(config.buffers.audio_packets(), MAX_CHANNEL_CAPACITY);
    }

    #[test]
    fn load_from_path_invalid_toml_errors() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "not = valid = toml").expect("failed to write invalid toml");

        let result = load_from_path(&config_path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn load_with_override_warns_and_falls_back() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        fs::write(temp_dir.path().join(CONFIG_FILE), "[playback]\nloops = \"many\"\n")
            .expect("failed to write config");

        let (config, warning) = load_with_override(Some(temp_dir.path().to_path_buf()));
        assert_eq!(config, Config::default());
        assert!(warning.is_some());
    }

    #[test]
    fn load_with_override_without_file_is_silent() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let (config, warning) = load_with_override(Some(temp_dir.path().to_path_buf()));
        assert_eq!(config, Config::default());
        assert!(warning.is_none());
    }
}
