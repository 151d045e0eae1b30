//! Integration tests for the piano context: recording, playback, songs and
//! lessons driven through a hand-stepped clock.

use std::collections::{BTreeSet, HashMap, HashSet};

use pianola::pipeline::{
    Clock, ManualClock, NoteKey, Owner, PitchClass, Song, SongEntry, TeachingState, Tone,
    ToneEngine, VoiceId,
};
use pianola::presentation::{Feedback, LightId, Message, Presentation, Status};
use pianola::{Piano, PianoError};

const C: NoteKey = NoteKey::new(PitchClass::C, 0);
const D: NoteKey = NoteKey::new(PitchClass::D, 0);
const E: NoteKey = NoteKey::new(PitchClass::E, 0);
const A: NoteKey = NoteKey::new(PitchClass::A, 0);
const B: NoteKey = NoteKey::new(PitchClass::B, 0);

/// Engine call, stamped with the clock time it happened at
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Start { at: u64, frequency: f64 },
    Stop { at: u64, frequency: f64, release: f64 },
}

/// Engine whose voices sound until stopped
struct MockEngine {
    clock: ManualClock,
    calls: Vec<Call>,
    frequencies: HashMap<VoiceId, f64>,
    sounding: HashSet<VoiceId>,
    next_id: u64,
}

impl MockEngine {
    fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            calls: Vec::new(),
            frequencies: HashMap::new(),
            sounding: HashSet::new(),
            next_id: 0,
        }
    }

    fn starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Start { .. }))
            .count()
    }

    fn stops(&self) -> Vec<(u64, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Stop { at, release, .. } => Some((*at, *release)),
                Call::Start { .. } => None,
            })
            .collect()
    }

    /// (time, on/off, key) for calls at or after `since`, keys at octave 4
    fn timeline(&self, since: u64) -> Vec<(u64, &'static str, NoteKey)> {
        let key_of = |frequency: f64| {
            [C, D, E, A, B]
                .into_iter()
                .find(|k| (k.frequency(4) - frequency).abs() < 1e-6)
                .unwrap()
        };
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Start { at, frequency } if at >= since => Some((at, "on", key_of(frequency))),
                Call::Stop { at, frequency, .. } if at >= since => {
                    Some((at, "off", key_of(frequency)))
                }
                _ => None,
            })
            .collect()
    }
}

impl ToneEngine for MockEngine {
    fn start(&mut self, tone: Tone) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.frequencies.insert(id, tone.frequency);
        self.sounding.insert(id);
        self.calls.push(Call::Start {
            at: self.clock.now_ms(),
            frequency: tone.frequency,
        });
        id
    }

    fn stop(&mut self, voice: VoiceId, release: f64) {
        if !self.sounding.remove(&voice) {
            return;
        }
        self.calls.push(Call::Stop {
            at: self.clock.now_ms(),
            frequency: self.frequencies[&voice],
            release,
        });
    }

    fn is_sounding(&self, voice: VoiceId) -> bool {
        self.sounding.contains(&voice)
    }
}

/// Presentation that keeps the current visual state
#[derive(Default)]
struct Screen {
    highlighted: BTreeSet<NoteKey>,
    cues: Vec<NoteKey>,
    lights: BTreeSet<LightId>,
    lights_added: usize,
    flashes: Vec<(NoteKey, Feedback)>,
    message: Option<Message>,
    status: Option<Status>,
    notices: Vec<String>,
}

impl Presentation for Screen {
    fn highlight(&mut self, key: NoteKey, on: bool) {
        if on {
            self.highlighted.insert(key);
        } else {
            self.highlighted.remove(&key);
        }
    }

    fn clear_highlights(&mut self) {
        self.highlighted.clear();
    }

    fn add_cue(&mut self, key: NoteKey) {
        self.cues.push(key);
    }

    fn remove_cue(&mut self, key: NoteKey) {
        self.cues.retain(|k| *k != key);
    }

    fn add_falling_light(&mut self, _key: NoteKey, light: LightId) {
        self.lights.insert(light);
        self.lights_added += 1;
    }

    fn remove_falling_light(&mut self, light: LightId) {
        self.lights.remove(&light);
    }

    fn flash(&mut self, key: NoteKey, feedback: Feedback) {
        self.flashes.push((key, feedback));
    }

    fn clear_flash(&mut self, key: NoteKey, feedback: Feedback) {
        self.flashes.retain(|f| *f != (key, feedback));
    }

    fn clear_indicators(&mut self) {
        self.cues.clear();
        self.lights.clear();
        self.flashes.clear();
    }

    fn set_message(&mut self, message: Option<&Message>) {
        self.message = message.cloned();
    }

    fn set_status(&mut self, status: Option<&Status>) {
        self.status = status.cloned();
    }

    fn notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}

type TestPiano = Piano<MockEngine, Screen, ManualClock>;

fn setup() -> (TestPiano, ManualClock) {
    let clock = ManualClock::new();
    let engine = MockEngine::new(clock.clone());
    let mut piano = Piano::new(Ok(engine), Screen::default(), clock.clone());
    piano.add_song(Song::new(
        "two",
        "Two Notes",
        vec![
            SongEntry::note(PitchClass::C, 0, 400, 0),
            SongEntry::note(PitchClass::D, 0, 400, 400),
        ],
    ));
    piano.add_song(Song::new(
        "scale",
        "Scale",
        vec![
            SongEntry::note(PitchClass::C, 0, 400, 0),
            SongEntry::rest(400, 400),
            SongEntry::note(PitchClass::D, 0, 400, 800),
            SongEntry::note(PitchClass::E, 0, 400, 1200),
        ],
    ));
    (piano, clock)
}

/// Fire every timer up to `until`, each at its own due time
fn run_until(piano: &mut TestPiano, clock: &ManualClock, until: u64) {
    while let Some(due) = piano.next_deadline() {
        if due > until {
            break;
        }
        clock.set(due.max(clock.now_ms()));
        piano.tick();
    }
    clock.set(until);
    piano.tick();
}

fn engine(piano: &TestPiano) -> &MockEngine {
    piano.engine().unwrap()
}

fn press(piano: &mut TestPiano, code: &str) {
    piano.key_down(code, false);
    piano.key_up(code);
}

#[test]
fn test_playback_preserves_timing_and_octave() {
    let (mut piano, clock) = setup();

    piano.start_recording();
    assert_eq!(piano.presentation().status, Some(Status::Recording));
    piano.key_down("KeyH", false);
    clock.set(300);
    piano.key_up("KeyH");
    clock.set(500);
    piano.key_down("KeyJ", false);
    clock.set(700);
    piano.key_up("KeyJ");
    clock.set(1000);
    piano.stop_recording();

    assert_eq!(piano.take().note_count(), 2);
    assert_eq!(
        piano.presentation().status.as_ref().map(|s| s.to_string()),
        Some("Recorded: 2 notes (0.7s)".to_string())
    );

    // Played back in the octave it was recorded in
    piano.set_octave(6).unwrap();
    clock.set(5000);
    piano.play_recording();
    assert!(piano.is_playing());
    run_until(&mut piano, &clock, 6000);

    assert_eq!(
        engine(&piano).timeline(5000),
        vec![
            (5000, "on", A),
            (5300, "off", A),
            (5500, "on", B),
            (5700, "off", B),
        ]
    );
    assert!(piano.is_idle());
    assert_eq!(piano.pending_timers(Owner::Playback), 0);
}

#[test]
fn test_late_tick_does_not_delay_later_events() {
    let (mut piano, clock) = setup();
    piano.start_recording();
    piano.key_down("KeyH", false);
    clock.set(300);
    piano.key_up("KeyH");
    clock.set(500);
    piano.key_down("KeyJ", false);
    piano.stop_recording();
    piano.key_up("KeyJ");

    clock.set(5000);
    piano.play_recording();

    // First wakeup is 350 ms late: both overdue events fire together
    clock.set(5350);
    assert_eq!(piano.tick(), 2);
    assert_eq!(piano.next_deadline(), Some(5500));

    clock.set(5500);
    piano.tick();
    assert_eq!(
        engine(&piano).timeline(5000),
        vec![(5350, "on", A), (5350, "off", A), (5500, "on", B)]
    );
    assert!(piano.is_idle());
}

#[test]
fn test_playback_does_not_rerecord() {
    let (mut piano, clock) = setup();
    piano.start_recording();
    piano.key_down("KeyA", false);
    clock.set(200);
    piano.key_up("KeyA");
    piano.stop_recording();
    let events = piano.take().events().to_vec();

    piano.play_recording();
    run_until(&mut piano, &clock, 1000);
    assert_eq!(piano.take().events(), events.as_slice());
}

#[test]
fn test_empty_take_does_not_play() {
    let (mut piano, _) = setup();
    piano.start_recording();
    piano.stop_recording();
    assert!(piano.take().is_empty());
    assert_eq!(piano.presentation().status, None);

    piano.play_recording();
    assert!(piano.is_idle());
}

#[test]
fn test_stop_playback_cancels_remaining_events() {
    let (mut piano, clock) = setup();
    piano.start_recording();
    piano.key_down("KeyA", false);
    clock.set(1000);
    piano.key_up("KeyA");
    piano.stop_recording();

    clock.set(2000);
    piano.play_recording();
    piano.tick();
    assert_eq!(engine(&piano).starts(), 2);

    piano.stop_playback();
    assert!(piano.is_idle());
    assert_eq!(piano.pending_timers(Owner::Playback), 0);
    assert!(piano.presentation().highlighted.is_empty());
}

#[test]
fn test_song_plays_and_stops_itself() {
    let (mut piano, clock) = setup();
    piano.play_song("two");
    assert_eq!(
        piano.presentation().status,
        Some(Status::Song {
            name: "Two Notes".to_string()
        })
    );

    run_until(&mut piano, &clock, 1000);
    assert_eq!(
        engine(&piano).timeline(0),
        vec![
            (0, "on", C),
            (400, "off", C),
            (400, "on", D),
            (800, "off", D),
        ]
    );
    assert!(piano.is_idle());
    assert_eq!(piano.presentation().status, None);
    assert_eq!(piano.next_deadline(), None);
}

#[test]
fn test_song_rest_is_silent() {
    let (mut piano, clock) = setup();
    piano.play_song("scale");
    run_until(&mut piano, &clock, 2000);

    let ons: Vec<_> = engine(&piano)
        .timeline(0)
        .into_iter()
        .filter(|(_, kind, _)| *kind == "on")
        .collect();
    assert_eq!(ons, vec![(0, "on", C), (800, "on", D), (1200, "on", E)]);
    assert!(piano.is_idle());
}

#[test]
fn test_stop_song_cancels_timers_and_voices() {
    let (mut piano, clock) = setup();
    piano.play_song("scale");
    clock.set(100);
    piano.tick();
    assert!(piano.pending_timers(Owner::Song) > 0);

    piano.stop_song();
    assert!(piano.is_idle());
    assert_eq!(piano.pending_timers(Owner::Song), 0);
    assert!(piano.registry().is_empty());
    assert_eq!(engine(&piano).stops(), vec![(100, 0.0)]);

    run_until(&mut piano, &clock, 5000);
    assert_eq!(engine(&piano).starts(), 1);
}

#[test]
fn test_lesson_walkthrough() {
    let (mut piano, clock) = setup();
    piano.start_teaching("scale");
    assert!(piano.is_teaching());
    assert_eq!(piano.teaching_state(), TeachingState::AwaitingInput(0));
    assert_eq!(piano.presentation().cues, vec![C]);
    assert_eq!(
        piano.presentation().message,
        Some(Message::Prompt {
            number: 1,
            total: 3,
            pitch: PitchClass::C
        })
    );

    // Wrong key: sounded and flashed, target unchanged
    clock.set(100);
    press(&mut piano, "KeyS");
    assert_eq!(piano.teaching_state(), TeachingState::AwaitingInput(0));
    assert_eq!(piano.presentation().message, Some(Message::WrongKey));
    assert_eq!(piano.presentation().flashes, vec![(D, Feedback::Wrong)]);
    assert_eq!(engine(&piano).starts(), 1);

    run_until(&mut piano, &clock, 1600);
    assert!(piano.presentation().flashes.is_empty());
    assert_eq!(engine(&piano).stops().len(), 1);
    assert!(matches!(
        piano.presentation().message,
        Some(Message::Prompt { number: 1, .. })
    ));

    // Right key: the next cue appears after a pause
    clock.set(2100);
    press(&mut piano, "KeyA");
    assert_eq!(piano.teaching_state(), TeachingState::AwaitingInput(1));
    assert!(piano.presentation().cues.is_empty());
    run_until(&mut piano, &clock, 2899);
    assert!(piano.presentation().cues.is_empty());
    run_until(&mut piano, &clock, 2900);
    assert_eq!(piano.presentation().cues, vec![D]);
    assert!(matches!(
        piano.presentation().message,
        Some(Message::Prompt { number: 2, total: 3, .. })
    ));

    clock.set(3000);
    press(&mut piano, "KeyS");
    run_until(&mut piano, &clock, 4000);
    press(&mut piano, "KeyD");
    assert_eq!(piano.teaching_state(), TeachingState::Completed);
    assert_eq!(
        piano.presentation().message,
        Some(Message::Completed {
            song: "Scale".to_string()
        })
    );

    // Completed lessons ignore input
    let starts = engine(&piano).starts();
    clock.set(5000);
    press(&mut piano, "KeyA");
    assert_eq!(engine(&piano).starts(), starts);

    run_until(&mut piano, &clock, 6999);
    assert!(piano.is_teaching());
    run_until(&mut piano, &clock, 7000);
    assert!(piano.is_idle());
    assert_eq!(piano.teaching_state(), TeachingState::Idle);
    assert_eq!(piano.pending_timers(Owner::Teaching), 0);
    assert_eq!(piano.presentation().message, None);
}

#[test]
fn test_falling_light_repeats_until_answered() {
    let (mut piano, clock) = setup();
    piano.start_teaching("scale");
    assert_eq!(piano.presentation().lights_added, 1);

    run_until(&mut piano, &clock, 1999);
    assert_eq!(piano.presentation().lights_added, 1);
    run_until(&mut piano, &clock, 6000);
    assert_eq!(piano.presentation().lights_added, 4);
    assert_eq!(piano.presentation().lights.len(), 1);

    clock.set(6100);
    press(&mut piano, "KeyA");
    run_until(&mut piano, &clock, 6899);
    assert_eq!(piano.presentation().lights_added, 4);
}

#[test]
fn test_teaching_keys_do_not_release() {
    let (mut piano, clock) = setup();
    piano.start_teaching("two");
    piano.key_down("KeyA", false);
    piano.key_up("KeyA");
    assert!(engine(&piano).stops().is_empty());

    run_until(&mut piano, &clock, 600);
    assert_eq!(engine(&piano).stops().len(), 1);
}

#[test]
fn test_stop_teaching_clears_everything() {
    let (mut piano, clock) = setup();
    piano.start_teaching("scale");
    clock.set(100);
    press(&mut piano, "KeyS");
    assert!(piano.pending_timers(Owner::Teaching) > 0);

    // Starting again toggles the lesson off
    piano.start_teaching("scale");
    assert!(piano.is_idle());
    assert_eq!(piano.pending_timers(Owner::Teaching), 0);
    assert_eq!(piano.presentation().message, None);
    assert!(piano.presentation().cues.is_empty());
    assert!(piano.presentation().lights.is_empty());
    assert!(piano.presentation().flashes.is_empty());
    assert!(piano.registry().is_empty());
}

#[test]
fn test_modes_reject_each_other() {
    let (mut piano, _) = setup();
    piano.play_song("two");
    piano.start_recording();
    piano.start_teaching("two");
    assert!(piano.is_song_playing());
    assert_eq!(piano.pending_timers(Owner::Teaching), 0);

    piano.stop_song();
    piano.start_teaching("two");
    piano.play_song("two");
    assert!(piano.is_teaching());
    assert_eq!(piano.pending_timers(Owner::Song), 0);
}

#[test]
fn test_duplicate_note_on_keeps_one_voice() {
    let (mut piano, _) = setup();
    piano.pointer_down(C);
    piano.key_down("KeyA", false);
    piano.key_down("KeyA", true);
    assert_eq!(engine(&piano).starts(), 1);
    assert_eq!(piano.registry().len(), 1);
}

#[test]
fn test_held_key_is_debounced() {
    let (mut piano, _) = setup();
    piano.key_down("KeyA", false);
    piano.key_up("KeyA");
    piano.key_down("KeyA", false);
    piano.key_down("KeyA", false);
    assert_eq!(engine(&piano).starts(), 2);
}

#[test]
fn test_sustained_notes_wait_for_sustain_off() {
    let (mut piano, _) = setup();
    piano.set_sustain_mode(true);
    piano.key_down("KeyA", false);
    piano.key_up("KeyA");
    piano.key_down("KeyS", false);
    piano.key_up("KeyS");

    assert!(engine(&piano).stops().is_empty());
    assert!(piano.registry().is_sustained(C));
    assert!(piano.is_note_active(C));

    piano.set_sustain_mode(false);
    assert_eq!(engine(&piano).stops(), vec![(0, 0.2), (0, 0.2)]);
    assert!(piano.registry().is_empty());
}

#[test]
fn test_release_uses_current_instrument() {
    let (mut piano, _) = setup();
    piano.key_down("KeyA", false);
    piano.set_instrument(pianola::pipeline::Instrument::Organ);
    piano.key_up("KeyA");

    let release = pianola::pipeline::Instrument::Organ.profile().release;
    assert_eq!(engine(&piano).stops(), vec![(0, release)]);
}

#[test]
fn test_pointer_leave_only_releases_pressed_key() {
    let (mut piano, _) = setup();
    piano.pointer_down(C);
    piano.pointer_leave(D);
    assert!(engine(&piano).stops().is_empty());
    piano.pointer_leave(C);
    assert_eq!(engine(&piano).stops().len(), 1);
    assert!(piano.presentation().highlighted.is_empty());
}

#[test]
fn test_suspend_silences_and_resets() {
    let (mut piano, clock) = setup();
    piano.start_recording();
    piano.key_down("KeyA", false);
    clock.set(100);
    piano.suspend();

    assert!(piano.is_idle());
    assert!(piano.registry().is_empty());
    assert_eq!(engine(&piano).stops(), vec![(100, 0.0)]);
    assert!(!piano.take().is_empty());

    // Held keys were forgotten
    piano.key_down("KeyA", false);
    assert_eq!(engine(&piano).starts(), 2);
}

#[test]
fn test_missing_audio_shows_notice() {
    let clock = ManualClock::new();
    let mut piano: TestPiano = Piano::new(
        Err(PianoError::UnsupportedAudio("no device".into())),
        Screen::default(),
        clock.clone(),
    );
    assert!(!piano.has_audio());
    assert_eq!(
        piano.presentation().notices,
        vec!["Sound disabled: audio not supported: no device".to_string()]
    );

    // Lessons still run without sound
    piano.start_teaching("fur-elise");
    assert!(piano.is_teaching());
    press(&mut piano, "Semicolon");
    assert_eq!(piano.teaching_state(), TeachingState::AwaitingInput(1));
}

#[test]
fn test_fur_elise_lesson_on_synth() {
    use pianola::pipeline::{SynthEngine, LAYOUT};
    use pianola::presentation::LogPresentation;

    let clock = ManualClock::new();
    let mut piano = Piano::new(SynthEngine::new(8000), LogPresentation, clock.clone());
    let notes = piano.songs().get("fur-elise").unwrap().notes();

    piano.start_teaching("fur-elise");
    let mut frame = [0.0f32; 80];
    for (i, key) in notes.iter().enumerate() {
        assert_eq!(piano.teaching_state(), TeachingState::AwaitingInput(i));
        let code = LAYOUT.iter().find(|b| b.key == *key).unwrap().code;
        piano.key_down(code, false);
        piano.key_up(code);

        // 10 ms per frame at 8 kHz
        for _ in 0..100 {
            clock.advance(10);
            piano.tick();
            piano.engine_mut().unwrap().render(&mut frame);
        }
    }
    assert_eq!(piano.teaching_state(), TeachingState::Completed);

    clock.advance(3000);
    piano.tick();
    assert!(piano.is_idle());
    assert_eq!(piano.pending_timers(Owner::Teaching), 0);
}
