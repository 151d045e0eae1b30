//! Presentation port
//!
//! The piano core reports visual state changes through `Presentation` and
//! never knows how they are drawn. Every method has an empty default so a
//! host only implements what it renders.

use std::fmt;

use crate::pipeline::note::{NoteKey, PitchClass};
use crate::pipeline::recorder::TakeSummary;

/// Handle to one falling-light decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u64);

/// Teaching feedback flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    Correct,
    Wrong,
}

/// Lesson message line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    TeachingStarted { song: String },
    /// Which note to press next (`number` counts from 1)
    Prompt {
        number: usize,
        total: usize,
        pitch: PitchClass,
    },
    WrongKey,
    Completed { song: String },
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::TeachingStarted { song } => write!(
                f,
                "Teaching mode active - press the glowing keys to learn {}!",
                song
            ),
            Message::Prompt {
                number,
                total,
                pitch,
            } => write!(
                f,
                "Note {} of {} - press the glowing {} key!",
                number, total, pitch
            ),
            Message::WrongKey => f.write_str("Wrong key! Try again - press the glowing key!"),
            Message::Completed { song } => {
                write!(f, "Congratulations! You completed {}! Well done!", song)
            }
        }
    }
}

/// Recording / song status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Recording,
    Playing,
    Recorded(TakeSummary),
    Song { name: String },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Recording => f.write_str("Recording..."),
            Status::Playing => f.write_str("Playing..."),
            Status::Recorded(summary) => fmt::Display::fmt(summary, f),
            Status::Song { name } => write!(f, "Playing: {}", name),
        }
    }
}

/// Visual side of the piano
pub trait Presentation {
    /// Show or hide a key as pressed
    fn highlight(&mut self, _key: NoteKey, _on: bool) {}

    /// Un-press every key
    fn clear_highlights(&mut self) {}

    /// Make a key glow as the next lesson target
    fn add_cue(&mut self, _key: NoteKey) {}

    fn remove_cue(&mut self, _key: NoteKey) {}

    fn add_falling_light(&mut self, _key: NoteKey, _light: LightId) {}

    fn remove_falling_light(&mut self, _light: LightId) {}

    fn flash(&mut self, _key: NoteKey, _feedback: Feedback) {}

    fn clear_flash(&mut self, _key: NoteKey, _feedback: Feedback) {}

    /// Drop every cue, falling light and flash
    fn clear_indicators(&mut self) {}

    /// Lesson message; `None` hides it
    fn set_message(&mut self, _message: Option<&Message>) {}

    /// Status line; `None` clears it
    fn set_status(&mut self, _status: Option<&Status>) {}

    /// One-off user-facing notice, e.g. missing audio support
    fn notice(&mut self, _text: &str) {}
}

/// Presentation that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresentation;

impl Presentation for NullPresentation {}

/// Presentation that reports changes through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresentation;

impl Presentation for LogPresentation {
    fn highlight(&mut self, key: NoteKey, on: bool) {
        tracing::trace!(%key, on, "highlight");
    }

    fn add_cue(&mut self, key: NoteKey) {
        tracing::debug!(%key, "cue");
    }

    fn flash(&mut self, key: NoteKey, feedback: Feedback) {
        tracing::debug!(%key, ?feedback, "flash");
    }

    fn set_message(&mut self, message: Option<&Message>) {
        if let Some(message) = message {
            tracing::info!("{}", message);
        }
    }

    fn set_status(&mut self, status: Option<&Status>) {
        if let Some(status) = status {
            tracing::info!("{}", status);
        }
    }

    fn notice(&mut self, text: &str) {
        tracing::warn!("{}", text);
    }
}
