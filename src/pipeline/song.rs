//! Songs and the built-in song book
//!
//! A song is a fixed list of entries. Each entry is a note or a rest with a
//! duration and a delay measured from the start of the song (not from the
//! previous entry).

use std::collections::BTreeMap;

use crate::pipeline::note::{NoteKey, PitchClass};

/// What an entry plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Note(NoteKey),
    Rest,
}

/// One entry of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongEntry {
    pub step: Step,
    /// How long the note sounds, or how long the rest lasts
    pub duration_ms: u64,
    /// Offset from the start of the song
    pub delay_ms: u64,
}

impl SongEntry {
    pub const fn note(pitch: PitchClass, offset: u8, duration_ms: u64, delay_ms: u64) -> Self {
        Self {
            step: Step::Note(NoteKey::new(pitch, offset)),
            duration_ms,
            delay_ms,
        }
    }

    pub const fn rest(duration_ms: u64, delay_ms: u64) -> Self {
        Self {
            step: Step::Rest,
            duration_ms,
            delay_ms,
        }
    }

    pub fn key(&self) -> Option<NoteKey> {
        match self.step {
            Step::Note(key) => Some(key),
            Step::Rest => None,
        }
    }
}

/// An immutable, authored note sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    id: String,
    name: String,
    entries: Vec<SongEntry>,
}

impl Song {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entries: Vec<SongEntry>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entries,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[SongEntry] {
        &self.entries
    }

    /// Keys of the song's notes in order, rests skipped
    pub fn notes(&self) -> Vec<NoteKey> {
        self.entries.iter().filter_map(SongEntry::key).collect()
    }

    /// Time from song start until the last entry ends
    pub fn length_ms(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.delay_ms + e.duration_ms)
            .max()
            .unwrap_or(0)
    }
}

/// Songs by id
#[derive(Debug, Clone, Default)]
pub struct SongBook {
    songs: BTreeMap<String, Song>,
}

impl SongBook {
    /// An empty song book
    pub fn new() -> Self {
        Self::default()
    }

    /// The song book with every built-in song
    pub fn builtin() -> Self {
        let mut book = Self::new();
        book.insert(fur_elise());
        book
    }

    /// Add a song, replacing any song with the same id
    pub fn insert(&mut self, song: Song) -> Option<Song> {
        self.songs.insert(song.id.clone(), song)
    }

    pub fn get(&self, id: &str) -> Option<&Song> {
        self.songs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.songs.values()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

/// Opening of Beethoven's "Für Elise"
pub fn fur_elise() -> Song {
    use PitchClass::*;

    let entries = vec![
        // E D# E D# E B D C A
        SongEntry::note(E, 1, 400, 0),
        SongEntry::note(DSharp, 1, 400, 400),
        SongEntry::note(E, 1, 400, 800),
        SongEntry::note(DSharp, 1, 400, 1200),
        SongEntry::note(E, 1, 400, 1600),
        SongEntry::note(B, 0, 400, 2000),
        SongEntry::note(D, 1, 400, 2400),
        SongEntry::note(C, 1, 400, 2800),
        SongEntry::note(A, 0, 600, 3200),
        SongEntry::rest(400, 3800),
        // E A A B
        SongEntry::note(E, 0, 400, 4200),
        SongEntry::note(A, 0, 400, 4600),
        SongEntry::note(A, 0, 400, 5000),
        SongEntry::note(B, 0, 600, 5400),
        SongEntry::rest(400, 6000),
        // E A B C
        SongEntry::note(E, 0, 400, 6400),
        SongEntry::note(A, 0, 400, 6800),
        SongEntry::note(B, 0, 400, 7200),
        SongEntry::note(C, 1, 600, 7600),
        SongEntry::rest(400, 8200),
        // Opening again, from the low E
        SongEntry::note(E, 0, 400, 8600),
        SongEntry::note(E, 1, 400, 9000),
        SongEntry::note(DSharp, 1, 400, 9400),
        SongEntry::note(E, 1, 400, 9800),
        SongEntry::note(DSharp, 1, 400, 10200),
        SongEntry::note(E, 1, 400, 10600),
        SongEntry::note(B, 0, 400, 11000),
        SongEntry::note(D, 1, 400, 11400),
        SongEntry::note(C, 1, 400, 11800),
        SongEntry::note(A, 0, 600, 12200),
        SongEntry::rest(400, 12800),
        SongEntry::note(E, 0, 400, 13200),
        SongEntry::note(A, 0, 400, 13600),
        SongEntry::note(A, 0, 400, 14000),
        SongEntry::note(B, 0, 600, 14400),
        SongEntry::rest(400, 15000),
        SongEntry::note(E, 0, 400, 15400),
        SongEntry::note(C, 1, 400, 15800),
        SongEntry::note(B, 0, 400, 16200),
        SongEntry::note(A, 0, 800, 16600),
    ];

    Song::new("fur-elise", "Für Elise", entries)
}
