//! Note registry: which keys are sounding and which are sustained
//!
//! At most one voice per key. Keys started while sustain mode is on are
//! marked sustained and ignore `note_off` until `release_all_sustained` or
//! `clear_all`. Voices that ended on their own are reaped lazily the next
//! time their key is looked at.

use std::collections::{HashMap, HashSet};

use crate::pipeline::note::NoteKey;
use crate::pipeline::tone::{Tone, ToneEngine, VoiceId};

/// Outcome of a `note_off` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOff {
    /// The voice was told to fade out
    Released,
    /// The key is sustained, nothing happened
    Deferred,
    /// No live voice for this key
    Absent,
}

/// Map of sounding keys to their voices
#[derive(Debug, Default)]
pub struct NoteRegistry {
    active: HashMap<NoteKey, VoiceId>,
    sustained: HashSet<NoteKey>,
}

impl NoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget `key` if its voice already finished
    fn reap<E: ToneEngine + ?Sized>(&mut self, engine: &E, key: NoteKey) {
        if let Some(&voice) = self.active.get(&key) {
            if !engine.is_sounding(voice) {
                self.active.remove(&key);
                self.sustained.remove(&key);
            }
        }
    }

    /// Whether `key` has a live voice
    pub fn is_active<E: ToneEngine + ?Sized>(&mut self, engine: &E, key: NoteKey) -> bool {
        self.reap(engine, key);
        self.active.contains_key(&key)
    }

    /// Start a voice for `key` unless one is already sounding.
    ///
    /// Returns the new voice, or `None` for a duplicate.
    pub fn note_on<E: ToneEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        key: NoteKey,
        tone: Tone,
    ) -> Option<VoiceId> {
        if self.is_active(engine, key) {
            return None;
        }

        let voice = engine.start(tone);
        self.active.insert(key, voice);
        if tone.sustain {
            self.sustained.insert(key);
        }
        Some(voice)
    }

    /// Release `key` over `release` seconds unless it is sustained
    pub fn note_off<E: ToneEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        key: NoteKey,
        release: f64,
    ) -> NoteOff {
        if self.sustained.contains(&key) {
            return NoteOff::Deferred;
        }
        match self.active.remove(&key) {
            Some(voice) if engine.is_sounding(voice) => {
                engine.stop(voice, release);
                NoteOff::Released
            }
            _ => NoteOff::Absent,
        }
    }

    /// Release every sustained key with a `fade` second ramp
    pub fn release_all_sustained<E: ToneEngine + ?Sized>(&mut self, engine: &mut E, fade: f64) {
        for key in self.sustained.drain() {
            if let Some(voice) = self.active.remove(&key) {
                engine.stop(voice, fade);
            }
        }
    }

    /// Stop every voice at once and empty the registry
    pub fn clear_all<E: ToneEngine + ?Sized>(&mut self, engine: &mut E) {
        for (_, voice) in self.active.drain() {
            engine.stop(voice, 0.0);
        }
        self.sustained.clear();
    }

    pub fn voice(&self, key: NoteKey) -> Option<VoiceId> {
        self.active.get(&key).copied()
    }

    pub fn is_sustained(&self, key: NoteKey) -> bool {
        self.sustained.contains(&key)
    }

    /// Registered keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = NoteKey> + '_ {
        self.active.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn sustained_len(&self) -> usize {
        self.sustained.len()
    }
}
