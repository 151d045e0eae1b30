//! Piano configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [audio]
//! sample_rate = 44100
//!
//! [keyboard]
//! octave = 3
//! instrument = "organ"
//!
//! [timing]
//! cue_repeat_ms = 1500
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PianoError;
use crate::pipeline::instrument::Instrument;
use crate::pipeline::note::{MAX_OCTAVE, MIN_OCTAVE};
use crate::pipeline::tone::SAMPLE_RATE_RANGE;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PianoConfig {
    pub audio: AudioConfig,
    pub keyboard: KeyboardConfig,
    pub timing: TimingConfig,
}

/// Synth engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of samples rendered per frame
    pub frame_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_size: 64,
        }
    }
}

/// Initial keyboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Base octave (1-7)
    pub octave: u8,
    /// Master volume (0.0 to 1.0)
    pub volume: f32,
    pub instrument: Instrument,
    pub sustain: bool,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            octave: 4,
            volume: 0.7,
            instrument: Instrument::Piano,
            sustain: false,
        }
    }
}

/// Delays used by sustain release and teaching, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Fade applied to sustained notes when sustain turns off
    pub sustain_release_ms: u64,
    /// Pause after a correct note before the next cue
    pub cue_pause_ms: u64,
    /// Falling light interval (and light lifetime)
    pub cue_repeat_ms: u64,
    /// How long the wrong-key message stays up
    pub error_message_ms: u64,
    /// Delay between finishing a lesson and leaving teaching mode
    pub completion_ms: u64,
    pub correct_hold_ms: u64,
    pub wrong_hold_ms: u64,
    pub correct_flash_ms: u64,
    pub wrong_flash_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sustain_release_ms: 200,
            cue_pause_ms: 800,
            cue_repeat_ms: 2000,
            error_message_ms: 1500,
            completion_ms: 3000,
            correct_hold_ms: 600,
            wrong_hold_ms: 400,
            correct_flash_ms: 300,
            wrong_flash_ms: 500,
        }
    }
}

impl PianoConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PianoError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PianoError::read_config(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, PianoError> {
        let config: PianoConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the config as TOML
    pub fn to_toml_string(&self) -> Result<String, PianoError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), PianoError> {
        if !SAMPLE_RATE_RANGE.contains(&self.audio.sample_rate) {
            return Err(PianoError::InvalidConfig {
                field: "audio.sample_rate",
                reason: format!(
                    "{} Hz outside {}-{} Hz",
                    self.audio.sample_rate,
                    SAMPLE_RATE_RANGE.start(),
                    SAMPLE_RATE_RANGE.end()
                ),
            });
        }
        if self.audio.frame_size == 0 {
            return Err(PianoError::InvalidConfig {
                field: "audio.frame_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&self.keyboard.octave) {
            return Err(PianoError::InvalidConfig {
                field: "keyboard.octave",
                reason: format!(
                    "{} outside {}-{}",
                    self.keyboard.octave, MIN_OCTAVE, MAX_OCTAVE
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.keyboard.volume) {
            return Err(PianoError::InvalidConfig {
                field: "keyboard.volume",
                reason: format!("{} outside 0.0-1.0", self.keyboard.volume),
            });
        }
        if self.timing.cue_repeat_ms == 0 {
            return Err(PianoError::InvalidConfig {
                field: "timing.cue_repeat_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
