//! Performance recording and playback state
//!
//! A `Recorder` collects note events while recording is on. Stopping it
//! freezes the events into a `Take`, which is replayed by a
//! `PlaybackCursor`. Playback targets are absolute (`start + at_ms`) so a
//! late timer never pushes the remaining events back.

use std::fmt;

use crate::pipeline::note::NoteKey;

/// Note event direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    On,
    Off,
}

/// One recorded note event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub key: NoteKey,
    /// Base octave selected when the event was played
    pub octave: u8,
    /// Milliseconds since recording started
    pub at_ms: u64,
}

/// Recording in progress
#[derive(Debug, Clone)]
pub struct Recorder {
    started_at: u64,
    events: Vec<RecordedEvent>,
}

impl Recorder {
    pub fn new(started_at: u64) -> Self {
        Self {
            started_at,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: EventKind, key: NoteKey, octave: u8, now_ms: u64) {
        self.events.push(RecordedEvent {
            kind,
            key,
            octave,
            at_ms: now_ms.saturating_sub(self.started_at),
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stop recording and freeze the events
    pub fn finish(self) -> Take {
        Take {
            events: self.events,
        }
    }
}

/// A finished recording
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Take {
    events: Vec<RecordedEvent>,
}

impl Take {
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of note-on events
    pub fn note_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::On)
            .count()
    }

    /// Offset of the last event
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map_or(0, |e| e.at_ms)
    }

    /// Summary line, e.g. "Recorded: 3 notes (1.5s)"
    pub fn summary(&self) -> Option<TakeSummary> {
        (!self.is_empty()).then(|| TakeSummary {
            notes: self.note_count(),
            duration_ms: self.duration_ms(),
        })
    }
}

/// Note count and length of a take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeSummary {
    pub notes: usize,
    pub duration_ms: u64,
}

impl fmt::Display for TakeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recorded: {} notes ({:.1}s)",
            self.notes,
            self.duration_ms as f64 / 1000.0
        )
    }
}

/// Position within a take being played back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    started_at: u64,
    index: usize,
}

impl PlaybackCursor {
    pub fn new(started_at: u64) -> Self {
        Self {
            started_at,
            index: 0,
        }
    }

    /// Absolute due time of the next event, if any remain
    pub fn next_due(&self, take: &Take) -> Option<u64> {
        take.events
            .get(self.index)
            .map(|e| self.started_at + e.at_ms)
    }

    /// Take the next event
    pub fn advance(&mut self, take: &Take) -> Option<RecordedEvent> {
        let event = take.events.get(self.index).copied()?;
        self.index += 1;
        Some(event)
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
