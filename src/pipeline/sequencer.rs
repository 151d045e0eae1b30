//! Song sequencing
//!
//! `SongRun` walks a song entry by entry and says what to do next; the piano
//! turns each `Cue` into timers. Inter-onset gaps come from the authored
//! absolute delays, so a note may still be sounding when the next one starts.

use crate::pipeline::note::NoteKey;
use crate::pipeline::song::{Song, Step};

/// When to continue after a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Play the next entry after this many ms
    After(u64),
    /// This was the last entry; the song ends after this many ms
    End(u64),
}

/// What the current entry asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Silence, then the next entry
    Rest { wait_ms: u64 },
    /// Note-on now, note-off after `hold_ms`
    Note { key: NoteKey, hold_ms: u64, next: Next },
}

/// A song being played
#[derive(Debug, Clone)]
pub struct SongRun {
    song: Song,
    index: usize,
}

impl SongRun {
    pub fn new(song: Song) -> Self {
        Self { song, index: 0 }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Index of the next entry to play
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.song.entries().len()
    }

    /// Consume the current entry. `None` once the song is exhausted.
    pub fn advance(&mut self) -> Option<Cue> {
        let entries = self.song.entries();
        let entry = *entries.get(self.index)?;
        self.index += 1;

        let key = match entry.step {
            Step::Rest => {
                return Some(Cue::Rest {
                    wait_ms: entry.duration_ms,
                })
            }
            Step::Note(key) => key,
        };

        let next = match entries.get(self.index) {
            Some(following) => Next::After(following.delay_ms.saturating_sub(entry.delay_ms)),
            None => Next::End(entry.duration_ms),
        };

        Some(Cue::Note {
            key,
            hold_ms: entry.duration_ms,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::note::PitchClass;
    use crate::pipeline::song::SongEntry;

    const C: NoteKey = NoteKey::new(PitchClass::C, 0);
    const D: NoteKey = NoteKey::new(PitchClass::D, 0);

    #[test]
    fn test_two_note_song() {
        let song = Song::new(
            "two",
            "Two",
            vec![
                SongEntry::note(PitchClass::C, 0, 400, 0),
                SongEntry::note(PitchClass::D, 0, 400, 400),
            ],
        );
        let mut run = SongRun::new(song);

        assert_eq!(
            run.advance(),
            Some(Cue::Note {
                key: C,
                hold_ms: 400,
                next: Next::After(400)
            })
        );
        assert_eq!(
            run.advance(),
            Some(Cue::Note {
                key: D,
                hold_ms: 400,
                next: Next::End(400)
            })
        );
        assert!(run.is_finished());
        assert_eq!(run.advance(), None);
    }

    #[test]
    fn test_rest_waits_duration() {
        let song = Song::new(
            "rest",
            "Rest",
            vec![
                SongEntry::note(PitchClass::C, 0, 600, 0),
                SongEntry::rest(400, 600),
                SongEntry::note(PitchClass::D, 0, 400, 1000),
            ],
        );
        let mut run = SongRun::new(song);
        run.advance();
        assert_eq!(run.advance(), Some(Cue::Rest { wait_ms: 400 }));
        assert_eq!(run.index(), 2);
    }

    #[test]
    fn test_overlap_kept() {
        // Held longer than the gap to the next onset
        let song = Song::new(
            "legato",
            "Legato",
            vec![
                SongEntry::note(PitchClass::C, 0, 600, 0),
                SongEntry::note(PitchClass::D, 0, 400, 400),
            ],
        );
        let mut run = SongRun::new(song);
        match run.advance() {
            Some(Cue::Note { hold_ms, next, .. }) => {
                assert_eq!(hold_ms, 600);
                assert_eq!(next, Next::After(400));
            }
            other => panic!("unexpected cue {:?}", other),
        }
    }

    #[test]
    fn test_trailing_rest_then_end() {
        let song = Song::new("r", "R", vec![SongEntry::rest(250, 0)]);
        let mut run = SongRun::new(song);
        assert_eq!(run.advance(), Some(Cue::Rest { wait_ms: 250 }));
        assert_eq!(run.advance(), None);
    }
}
