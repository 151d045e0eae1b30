//! Error types for the piano core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the piano core.
///
/// Mode conflicts (e.g. recording while a song plays) are not errors: they
/// are rejected silently and only logged.
#[derive(Debug, Error)]
pub enum PianoError {
    /// The audio backend cannot produce sound. Fatal to sound features only.
    #[error("audio not supported: {0}")]
    UnsupportedAudio(String),

    /// No song with this id in the song book
    #[error("song not found: {0}")]
    UnknownSong(String),

    /// No instrument profile with this name
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Pitch class string could not be parsed
    #[error("invalid pitch class: {0}")]
    InvalidPitchClass(String),

    /// Base octave outside 1..=7
    #[error("octave {0} out of range (1-7)")]
    InvalidOctave(u8),

    /// Failed to read a config file
    #[error("failed to read config '{path}': {source}")]
    ReadConfig {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// Failed to write TOML
    #[error("failed to serialize config: {0}")]
    SerializeConfig(#[from] toml::ser::Error),

    /// Config parsed but holds an out-of-range value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidConfig {
        /// Dotted name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl PianoError {
    /// Create a read config error.
    pub fn read_config(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PianoError::ReadConfig {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PianoError>;
