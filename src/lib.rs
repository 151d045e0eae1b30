//! Note scheduling and envelope synthesis core for a two-octave virtual piano.
//!
//! The crate is split the way a small synth is:
//! - [`generator`]: sample-level building blocks (oscillators, gain envelopes)
//! - [`pipeline`]: the note event core (registry, scheduler, recorder, songs,
//!   lessons, input routing and the tone engine)
//! - [`piano`]: the application context hosts drive
//!
//! A host owns a [`Piano`], forwards key and pointer input to it, calls
//! [`Piano::tick`] when timers are due and renders audio through the engine.
//!
//! ```no_run
//! use pianola::pipeline::{ManualClock, SynthEngine};
//! use pianola::presentation::NullPresentation;
//! use pianola::Piano;
//!
//! let clock = ManualClock::new();
//! let mut piano = Piano::new(SynthEngine::new(44100), NullPresentation, clock.clone());
//!
//! piano.key_down("KeyA", false);
//! clock.advance(500);
//! piano.tick();
//! piano.key_up("KeyA");
//!
//! let mut frame = [0.0f32; 64];
//! if let Some(engine) = piano.engine_mut() {
//!     engine.render(&mut frame);
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod piano;
pub mod pipeline;
pub mod presentation;

pub use config::PianoConfig;
pub use error::{PianoError, Result};
pub use piano::{Mode, Piano};
pub use presentation::{Presentation, Status};
