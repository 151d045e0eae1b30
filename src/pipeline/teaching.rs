//! Call-and-response lessons
//!
//! A `Lesson` walks the notes of a song (rests dropped) one at a time. Input
//! that matches the target advances the lesson; anything else leaves it
//! where it is. Timing of cues and feedback is handled by the piano.

use crate::pipeline::note::NoteKey;
use crate::pipeline::song::Song;

/// Where a lesson stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeachingState {
    Idle,
    /// Waiting for the note at this index
    AwaitingInput(usize),
    Completed,
}

/// Result of submitting a key to a lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Right key, more notes to go
    Correct { next: NoteKey },
    /// Right key and it was the last one
    Finished,
    /// Wrong key, the target is unchanged
    Wrong { expected: NoteKey },
    /// The lesson is already complete
    Ignored,
}

/// One run through a song's notes
#[derive(Debug, Clone)]
pub struct Lesson {
    song_name: String,
    notes: Vec<NoteKey>,
    index: usize,
}

impl Lesson {
    /// Start a lesson at the first note. `None` if the song has no notes.
    pub fn new(song: &Song) -> Option<Self> {
        let notes = song.notes();
        if notes.is_empty() {
            return None;
        }
        Some(Self {
            song_name: song.name().to_string(),
            notes,
            index: 0,
        })
    }

    pub fn song_name(&self) -> &str {
        &self.song_name
    }

    pub fn state(&self) -> TeachingState {
        if self.index >= self.notes.len() {
            TeachingState::Completed
        } else {
            TeachingState::AwaitingInput(self.index)
        }
    }

    /// The key the player should press next
    pub fn target(&self) -> Option<NoteKey> {
        self.notes.get(self.index).copied()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of notes in the lesson
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn submit(&mut self, key: NoteKey) -> Verdict {
        let Some(expected) = self.target() else {
            return Verdict::Ignored;
        };
        if key != expected {
            return Verdict::Wrong { expected };
        }

        self.index += 1;
        match self.target() {
            Some(next) => Verdict::Correct { next },
            None => Verdict::Finished,
        }
    }
}
