//! Note event pipeline
//!
//! Everything between an input and a sounding voice:
//! - Note: pitch classes, keys and frequencies
//! - Instrument: waveform and envelope profiles
//! - Tone: the voice engine port and the built-in synth
//! - Registry: active and sustained voices per key
//! - Scheduler: cancellable timers and clocks
//! - Recorder, Song, Sequencer, Teaching: the three auxiliary modes
//! - Router: keyboard and pointer input

pub mod instrument;
pub mod note;
pub mod recorder;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod sequencer;
pub mod song;
pub mod teaching;
pub mod tone;

pub use instrument::{Instrument, InstrumentProfile};
pub use note::{NoteKey, PitchClass, MAX_OCTAVE, MIN_OCTAVE};
pub use recorder::{EventKind, PlaybackCursor, RecordedEvent, Recorder, Take, TakeSummary};
pub use registry::{NoteOff, NoteRegistry};
pub use router::{InputRouter, KeyBinding, Route, LAYOUT};
pub use scheduler::{Clock, ManualClock, Owner, Scheduler, SystemClock, TimerId};
pub use sequencer::{Cue, Next, SongRun};
pub use song::{Song, SongBook, SongEntry, Step};
pub use teaching::{Lesson, TeachingState, Verdict};
pub use tone::{SynthEngine, Tone, ToneEngine, VoiceId};
