//! Instrument profiles
//!
//! Each instrument selects an oscillator waveform and an envelope shape.
//! Times are in seconds, the sustain level is a fraction of master volume.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PianoError;
use crate::generator::Waveform;

/// Built-in instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    #[default]
    Piano,
    Electric,
    Organ,
    Synthesizer,
    Harpsichord,
    Marimba,
}

/// Envelope and waveform settings for one instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentProfile {
    pub waveform: Waveform,
    /// Attack duration in seconds
    pub attack: f64,
    /// Decay duration in seconds
    pub decay: f64,
    /// Sustain level (0.0 to 1.0, scaled by master volume)
    pub sustain: f32,
    /// Release duration in seconds
    pub release: f64,
    /// Whether the envelope rests at the sustain level before releasing.
    /// Without a plateau the decay goes straight to near-zero.
    pub sustain_plateau: bool,
}

impl InstrumentProfile {
    /// Length of the natural envelope when nothing holds the note
    pub fn natural_length(&self) -> f64 {
        if self.sustain_plateau {
            self.attack + self.decay + self.release
        } else {
            self.attack + self.decay
        }
    }
}

impl Instrument {
    pub const ALL: [Instrument; 6] = [
        Instrument::Piano,
        Instrument::Electric,
        Instrument::Organ,
        Instrument::Synthesizer,
        Instrument::Harpsichord,
        Instrument::Marimba,
    ];

    pub fn profile(&self) -> InstrumentProfile {
        match self {
            Instrument::Piano => InstrumentProfile {
                waveform: Waveform::Triangle,
                attack: 0.01,
                decay: 0.8,
                sustain: 0.02,
                release: 0.4,
                sustain_plateau: false,
            },
            Instrument::Electric => InstrumentProfile {
                waveform: Waveform::Sawtooth,
                attack: 0.02,
                decay: 0.2,
                sustain: 0.25,
                release: 0.6,
                sustain_plateau: true,
            },
            Instrument::Organ => InstrumentProfile {
                waveform: Waveform::Sine,
                attack: 0.001,
                decay: 0.1,
                sustain: 0.8,
                release: 0.2,
                sustain_plateau: true,
            },
            Instrument::Synthesizer => InstrumentProfile {
                waveform: Waveform::Square,
                attack: 0.05,
                decay: 0.1,
                sustain: 0.7,
                release: 0.3,
                sustain_plateau: true,
            },
            Instrument::Harpsichord => InstrumentProfile {
                waveform: Waveform::Sawtooth,
                attack: 0.001,
                decay: 0.8,
                sustain: 0.05,
                release: 0.3,
                sustain_plateau: true,
            },
            Instrument::Marimba => InstrumentProfile {
                waveform: Waveform::Sine,
                attack: 0.02,
                decay: 1.0,
                sustain: 0.1,
                release: 1.5,
                sustain_plateau: true,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Electric => "electric",
            Instrument::Organ => "organ",
            Instrument::Synthesizer => "synthesizer",
            Instrument::Harpsichord => "harpsichord",
            Instrument::Marimba => "marimba",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = PianoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Instrument::ALL
            .into_iter()
            .find(|i| i.name() == wanted)
            .ok_or_else(|| PianoError::UnknownInstrument(s.to_string()))
    }
}
