//! Input routing: physical keys and pointer presses to note actions
//!
//! The keyboard layout covers two octaves. The home row and the row below
//! carry the white keys, the top row the black keys:
//!
//! ```text
//!  W E   T Y U   I O   P [ ]
//! A S D F G H J K L ; ' \ Z X
//! ```
//!
//! The router itself never plays anything. It debounces auto-repeat and
//! decides whether an input should sound, release or be judged by a lesson.

use std::collections::HashSet;

use crate::pipeline::note::{NoteKey, PitchClass};

/// One key of the computer keyboard bound to a piano key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    /// Physical key code (`KeyboardEvent.code` naming)
    pub code: &'static str,
    pub key: NoteKey,
    /// Hint printed on the piano key
    pub label: char,
}

const fn bind(code: &'static str, pitch: PitchClass, offset: u8, label: char) -> KeyBinding {
    KeyBinding {
        code,
        key: NoteKey::new(pitch, offset),
        label,
    }
}

/// The 24-key layout: 14 white keys then 10 black keys
pub const LAYOUT: [KeyBinding; 24] = [
    bind("KeyA", PitchClass::C, 0, 'A'),
    bind("KeyS", PitchClass::D, 0, 'S'),
    bind("KeyD", PitchClass::E, 0, 'D'),
    bind("KeyF", PitchClass::F, 0, 'F'),
    bind("KeyG", PitchClass::G, 0, 'G'),
    bind("KeyH", PitchClass::A, 0, 'H'),
    bind("KeyJ", PitchClass::B, 0, 'J'),
    bind("KeyK", PitchClass::C, 1, 'K'),
    bind("KeyL", PitchClass::D, 1, 'L'),
    bind("Semicolon", PitchClass::E, 1, ';'),
    bind("Quote", PitchClass::F, 1, '\''),
    bind("Backslash", PitchClass::G, 1, '\\'),
    bind("KeyZ", PitchClass::A, 1, 'Z'),
    bind("KeyX", PitchClass::B, 1, 'X'),
    bind("KeyW", PitchClass::CSharp, 0, 'W'),
    bind("KeyE", PitchClass::DSharp, 0, 'E'),
    bind("KeyT", PitchClass::FSharp, 0, 'T'),
    bind("KeyY", PitchClass::GSharp, 0, 'Y'),
    bind("KeyU", PitchClass::ASharp, 0, 'U'),
    bind("KeyI", PitchClass::CSharp, 1, 'I'),
    bind("KeyO", PitchClass::DSharp, 1, 'O'),
    bind("KeyP", PitchClass::FSharp, 1, 'P'),
    bind("BracketLeft", PitchClass::GSharp, 1, '['),
    bind("BracketRight", PitchClass::ASharp, 1, ']'),
];

/// Piano key bound to a physical key code
pub fn key_for_code(code: &str) -> Option<NoteKey> {
    LAYOUT.iter().find(|b| b.code == code).map(|b| b.key)
}

/// Keyboard hint for a piano key
pub fn label_for(key: NoteKey) -> Option<char> {
    LAYOUT.iter().find(|b| b.key == key).map(|b| b.label)
}

/// Physical key code for a typed character, for hosts that read text
pub fn code_for_char(c: char) -> Option<&'static str> {
    let c = c.to_ascii_uppercase();
    LAYOUT.iter().find(|b| b.label == c).map(|b| b.code)
}

/// What an input should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Start the note
    Play(NoteKey),
    /// Stop the note
    Release(NoteKey),
    /// Hand the key to the running lesson
    Teach(NoteKey),
}

/// Debounces keys and routes input by mode
#[derive(Debug, Default)]
pub struct InputRouter {
    held: HashSet<&'static str>,
    pointer_pressed: Option<NoteKey>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a key press. Auto-repeat and already-held keys are dropped.
    pub fn key_down(&mut self, code: &str, repeat: bool, teaching: bool) -> Option<Route> {
        let binding = LAYOUT.iter().find(|b| b.code == code)?;
        if repeat || !self.held.insert(binding.code) {
            return None;
        }
        Some(if teaching {
            Route::Teach(binding.key)
        } else {
            Route::Play(binding.key)
        })
    }

    /// Route a key release. Lessons ignore releases.
    pub fn key_up(&mut self, code: &str, teaching: bool) -> Option<Route> {
        let binding = LAYOUT.iter().find(|b| b.code == code)?;
        self.held.remove(binding.code);
        (!teaching).then_some(Route::Release(binding.key))
    }

    pub fn pointer_down(&mut self, key: NoteKey, teaching: bool) -> Route {
        if teaching {
            Route::Teach(key)
        } else {
            self.pointer_pressed = Some(key);
            Route::Play(key)
        }
    }

    pub fn pointer_up(&mut self, key: NoteKey, teaching: bool) -> Option<Route> {
        self.pointer_pressed = None;
        (!teaching).then_some(Route::Release(key))
    }

    /// The pointer left `key`. Only releases the key the pointer is holding.
    pub fn pointer_leave(&mut self, key: NoteKey, teaching: bool) -> Option<Route> {
        if teaching || self.pointer_pressed != Some(key) {
            return None;
        }
        self.pointer_pressed = None;
        Some(Route::Release(key))
    }

    /// Whether a physical key is currently held down
    pub fn is_held(&self, code: &str) -> bool {
        self.held.contains(code)
    }

    /// Forget held keys, e.g. after the window lost focus
    pub fn reset(&mut self) {
        self.held.clear();
        self.pointer_pressed = None;
    }
}
