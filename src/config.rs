//! Startup configuration, read once from a RON file. Every field has a
//! default matching the original tuning, so a partial file only has to
//! name what it changes and a missing file means "run with defaults".

use crate::scale::{Key, Scale};

use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, path::Path};

/// Errors from loading the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the file failed.
    IoError(io::Error),

    /// The file was read but is not valid RON for [`Config`].
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "io error: {}", e),
            ConfigError::RonSpannedError(e) => write!(f, "ron error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the control messages go, and how often.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TargetConfig {
    /// Host running the synthesis engine.
    pub host: String,
    /// The engine's OSC port. SuperCollider's sclang listens on 57120.
    pub port: u16,
    /// Mapping ticks per second.
    pub update_rate: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 57120,
            update_rate: 60.0,
        }
    }
}

/// Tempo and beat mapping: rpm drives bpm, speed drives beat intensity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RhythmConfig {
    /// Master switch for the whole rhythm section.
    pub enable_rhythm: bool,
    pub bpm_range: (f32, f32),
    pub rpm_range: (f32, f32),
    pub beat_intensity_range: (f32, f32),
    pub speed_range: (f32, f32),
    pub rpm_sensitivity: f32,
    pub speed_sensitivity: f32,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            enable_rhythm: true,
            bpm_range: (60.0, 180.0),
            rpm_range: (1000.0, 8000.0),
            beat_intensity_range: (0.3, 1.0),
            speed_range: (0.0, 300.0),
            rpm_sensitivity: 1.0,
            speed_sensitivity: 1.0,
        }
    }
}

/// Pitch and volume mapping: steering bends pitch, braking drops it,
/// throttle opens the volume.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MelodyConfig {
    /// Master switch for the whole melody section.
    pub enable_melody: bool,
    /// MIDI note the pitch offsets are relative to.
    pub base_pitch: i32,
    /// Raw steering input range; the wheel reports -1.0 to 1.0.
    pub steer_range: (f32, f32),
    /// Semitones of bend at full lock.
    pub steer_pitch_influence: f32,
    pub throttle_volume_range: (f32, f32),
    /// Semitones dropped under full braking.
    pub brake_pitch_drop: f32,
    pub scale: Scale,
    pub key: Key,
    pub steer_sensitivity: f32,
    pub throttle_sensitivity: f32,
    pub brake_sensitivity: f32,
}

impl Default for MelodyConfig {
    fn default() -> Self {
        Self {
            enable_melody: true,
            base_pitch: 60,
            steer_range: (-1.0, 1.0),
            steer_pitch_influence: 12.0,
            throttle_volume_range: (0.3, 1.0),
            brake_pitch_drop: 6.0,
            scale: Scale::Pentatonic,
            key: Key::C,
            steer_sensitivity: 1.0,
            throttle_sensitivity: 1.0,
            brake_sensitivity: 1.0,
        }
    }
}

/// Effect sends: pan from lateral G, distortion from wheel slip, reverb
/// from speed, filter from engine temperature.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EffectsConfig {
    /// Master switch for the whole effects section.
    pub enable_effects: bool,
    pub pan_range: (f32, f32),
    pub lateral_g_range: (f32, f32),
    pub distortion_range: (f32, f32),
    pub wheel_slip_threshold: f32,
    pub reverb_range: (f32, f32),
    pub speed_reverb_range: (f32, f32),
    pub filter_freq_range: (f32, f32),
    pub engine_temp_range: (f32, f32),
    pub filter_resonance: f32,
    pub turbo_threshold: f32,
    pub enable_turbo_sound: bool,
    pub enable_tc_abs_sound: bool,
    pub effects_sensitivity: f32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            enable_effects: true,
            pan_range: (-1.0, 1.0),
            lateral_g_range: (-3.0, 3.0),
            distortion_range: (0.0, 0.8),
            wheel_slip_threshold: 0.1,
            reverb_range: (0.1, 0.6),
            speed_reverb_range: (50.0, 250.0),
            filter_freq_range: (200.0, 8000.0),
            engine_temp_range: (70.0, 120.0),
            filter_resonance: 0.3,
            turbo_threshold: 0.5,
            enable_turbo_sound: true,
            enable_tc_abs_sound: true,
            effects_sensitivity: 1.0,
        }
    }
}

/// Slow-moving background texture and the lap-feedback triggers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AmbienceConfig {
    /// Master switch for the whole ambience section.
    pub enable_ambience: bool,
    pub warmth_range: (f32, f32),
    pub temp_range: (f32, f32),
    pub ambient_level: f32,
    pub enable_lap_feedback: bool,
    /// Whether an improved best lap fires the celebration one-shot.
    pub best_lap_celebration: bool,
    pub enable_warning_sounds: bool,
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            enable_ambience: true,
            warmth_range: (0.2, 0.9),
            temp_range: (70.0, 120.0),
            ambient_level: 0.3,
            enable_lap_feedback: true,
            best_lap_celebration: true,
            enable_warning_sounds: true,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    /// Exponential smoothing factor applied to the continuous outputs,
    /// 0 (frozen) to 1 (no smoothing).
    pub smoothing: f32,
    pub rhythm: RhythmConfig,
    pub melody: MelodyConfig,
    pub effects: EffectsConfig,
    pub ambience: AmbienceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            smoothing: 0.1,
            rhythm: RhythmConfig::default(),
            melody: MelodyConfig::default(),
            effects: EffectsConfig::default(),
            ambience: AmbienceConfig::default(),
        }
    }
}

impl Config {
    /// Parse a RON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let mut config: Config =
            ron::de::from_str(&text).map_err(ConfigError::RonSpannedError)?;
        config.smoothing = config.smoothing.clamp(0.0, 1.0);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_original_tuning() {
        let c = Config::default();
        assert_eq!(c.target.port, 57120);
        assert_eq!(c.rhythm.bpm_range, (60.0, 180.0));
        assert_eq!(c.melody.base_pitch, 60);
        assert_eq!(c.effects.wheel_slip_threshold, 0.1);
        assert_eq!(c.ambience.ambient_level, 0.3);
        assert_eq!(c.smoothing, 0.1);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "(target: (host: \"10.0.0.5\", port: 9000), rhythm: (bpm_range: (80.0, 160.0)))"
        )
        .unwrap();

        let c = Config::from_path(file.path()).unwrap();
        assert_eq!(c.target.host, "10.0.0.5");
        assert_eq!(c.target.port, 9000);
        // Unnamed field keeps its default.
        assert_eq!(c.target.update_rate, 60.0);
        assert_eq!(c.rhythm.bpm_range, (80.0, 160.0));
        assert_eq!(c.melody.scale, crate::scale::Scale::Pentatonic);
    }

    #[test]
    fn section_switches_parse_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "(effects: (enable_effects: false), ambience: (best_lap_celebration: false))"
        )
        .unwrap();

        let c = Config::from_path(file.path()).unwrap();
        assert!(!c.effects.enable_effects);
        assert!(!c.ambience.best_lap_celebration);
        // Unnamed switches stay on.
        assert!(c.rhythm.enable_rhythm);
        assert!(c.melody.enable_melody);
        assert!(c.ambience.enable_ambience);
    }

    #[test]
    fn smoothing_is_clamped_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(smoothing: 7.5)").unwrap();
        let c = Config::from_path(file.path()).unwrap();
        assert_eq!(c.smoothing, 1.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not ron").unwrap();
        assert!(matches!(
            Config::from_path(file.path()),
            Err(ConfigError::RonSpannedError(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::from_path("/definitely/not/here.ron"),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn config_round_trips_through_ron() {
        let c = Config::default();
        let text = ron::ser::to_string(&c).unwrap();
        let back: Config = ron::de::from_str(&text).unwrap();
        assert_eq!(c, back);
    }
}
