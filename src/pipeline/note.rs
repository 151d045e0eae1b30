//! Note identity: pitch classes, keyboard keys and their frequencies
//!
//! A key on the two-octave keyboard is a pitch class plus an octave offset
//! (0 for the lower octave, 1 for the upper one). The sounding octave is the
//! selected base octave plus that offset.

use std::fmt;
use std::str::FromStr;

use crate::error::PianoError;

/// Lowest selectable base octave
pub const MIN_OCTAVE: u8 = 1;
/// Highest selectable base octave
pub const MAX_OCTAVE: u8 = 7;
/// Octave of the reference frequency table
pub const REFERENCE_OCTAVE: i32 = 4;

/// Pitch classes with support for black keys (sharps only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in ascending order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Convert pitch class to semitone number (C=0, C#=1, D=2, ...)
    pub fn semitone(&self) -> u8 {
        *self as u8
    }

    /// Frequency in Hz of this pitch class in octave 4 (A4 = 440 Hz)
    pub fn base_frequency(&self) -> f64 {
        match self {
            PitchClass::C => 261.63,
            PitchClass::CSharp => 277.18,
            PitchClass::D => 293.66,
            PitchClass::DSharp => 311.13,
            PitchClass::E => 329.63,
            PitchClass::F => 349.23,
            PitchClass::FSharp => 369.99,
            PitchClass::G => 392.00,
            PitchClass::GSharp => 415.30,
            PitchClass::A => 440.00,
            PitchClass::ASharp => 466.16,
            PitchClass::B => 493.88,
        }
    }

    /// Frequency in Hz of this pitch class in the given octave
    ///
    /// Formula: f = base_freq * 2^(octave - 4)
    pub fn frequency(&self, octave: u8) -> f64 {
        self.base_frequency() * 2f64.powi(i32::from(octave) - REFERENCE_OCTAVE)
    }

    /// Whether the key for this pitch class is a black key
    pub fn is_black(&self) -> bool {
        matches!(
            self,
            PitchClass::CSharp
                | PitchClass::DSharp
                | PitchClass::FSharp
                | PitchClass::GSharp
                | PitchClass::ASharp
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = PianoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "c" | "C" => Ok(PitchClass::C),
            "c#" | "C#" => Ok(PitchClass::CSharp),
            "d" | "D" => Ok(PitchClass::D),
            "d#" | "D#" => Ok(PitchClass::DSharp),
            "e" | "E" => Ok(PitchClass::E),
            "f" | "F" => Ok(PitchClass::F),
            "f#" | "F#" => Ok(PitchClass::FSharp),
            "g" | "G" => Ok(PitchClass::G),
            "g#" | "G#" => Ok(PitchClass::GSharp),
            "a" | "A" => Ok(PitchClass::A),
            "a#" | "A#" => Ok(PitchClass::ASharp),
            "b" | "B" => Ok(PitchClass::B),
            _ => Err(PianoError::InvalidPitchClass(s.to_string())),
        }
    }
}

/// A key on the two-octave keyboard: pitch class and octave offset (0 or 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteKey {
    pub pitch: PitchClass,
    pub offset: u8,
}

impl NoteKey {
    pub const fn new(pitch: PitchClass, offset: u8) -> Self {
        Self { pitch, offset }
    }

    /// Octave this key sounds in for the given base octave
    pub fn effective_octave(&self, base_octave: u8) -> u8 {
        base_octave + self.offset
    }

    /// Frequency of this key for the given base octave
    pub fn frequency(&self, base_octave: u8) -> f64 {
        self.pitch.frequency(self.effective_octave(base_octave))
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.pitch, self.offset)
    }
}

/// Check that a base octave is selectable
pub fn validate_octave(octave: u8) -> Result<u8, PianoError> {
    if (MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        Ok(octave)
    } else {
        Err(PianoError::InvalidOctave(octave))
    }
}
