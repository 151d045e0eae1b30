//! The piano application context
//!
//! `Piano` owns every piece of mutable state: the tone engine, the note
//! registry, the timer list and the current `Mode`. Hosts feed it input and
//! call `tick` whenever a timer may be due (`next_deadline` says when).
//!
//! Recording, playback, song playback and teaching are mutually exclusive.
//! A request that does not fit the current mode is dropped and logged at
//! debug level.

use std::mem;

use tracing::{debug, error, info, warn};

use crate::config::{PianoConfig, TimingConfig};
use crate::error::PianoError;
use crate::pipeline::instrument::Instrument;
use crate::pipeline::note::{validate_octave, NoteKey, MAX_OCTAVE, MIN_OCTAVE};
use crate::pipeline::recorder::{EventKind, PlaybackCursor, RecordedEvent, Recorder, Take};
use crate::pipeline::registry::NoteRegistry;
use crate::pipeline::router::{InputRouter, Route};
use crate::pipeline::scheduler::{Clock, Owner, Scheduler, TimerId};
use crate::pipeline::sequencer::{Cue, Next, SongRun};
use crate::pipeline::song::{Song, SongBook};
use crate::pipeline::teaching::{Lesson, TeachingState, Verdict};
use crate::pipeline::tone::{Tone, ToneEngine};
use crate::presentation::{Feedback, LightId, Message, Presentation, Status};

/// What the piano is doing besides live play
#[derive(Debug, Clone)]
pub enum Mode {
    Idle,
    Recording(Recorder),
    Playing(PlaybackCursor),
    SongPlaying(SongRun),
    Teaching(Lesson),
}

/// Delayed work
#[derive(Debug, Clone, Copy, PartialEq)]
enum Task {
    PlaybackStep,
    SongStep,
    SongNoteOff(NoteKey),
    SongFinish,
    TeachingCue,
    TeachingLight(NoteKey),
    TeachingLightExpire(LightId),
    TeachingRelease(NoteKey),
    TeachingFlashEnd(NoteKey, Feedback),
    TeachingRestorePrompt,
    TeachingFinish,
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Two-octave piano: live play plus recording, songs and lessons
pub struct Piano<E: ToneEngine, P: Presentation, C: Clock> {
    /// `None` when audio is unsupported; everything but sound keeps working
    engine: Option<E>,
    presentation: P,
    clock: C,
    registry: NoteRegistry,
    scheduler: Scheduler<Task>,
    router: InputRouter,
    songs: SongBook,
    timing: TimingConfig,

    base_octave: u8,
    master_volume: f32,
    instrument: Instrument,
    sustain: bool,

    mode: Mode,
    take: Take,
    light_timer: Option<TimerId>,
    next_light: u64,
}

impl<E: ToneEngine, P: Presentation, C: Clock> Piano<E, P, C> {
    /// Create a piano with default settings and the built-in songs
    pub fn new(engine: Result<E, PianoError>, presentation: P, clock: C) -> Self {
        Self::with_config(engine, presentation, clock, &PianoConfig::default())
    }

    /// Create a piano from a config
    ///
    /// An engine error does not fail construction: it is shown once through
    /// `Presentation::notice` and the piano runs without sound.
    pub fn with_config(
        engine: Result<E, PianoError>,
        mut presentation: P,
        clock: C,
        config: &PianoConfig,
    ) -> Self {
        let engine = match engine {
            Ok(engine) => Some(engine),
            Err(err) => {
                error!(%err, "audio initialization failed, sound disabled");
                presentation.notice(&format!("Sound disabled: {}", err));
                None
            }
        };

        let keyboard = &config.keyboard;
        Self {
            engine,
            presentation,
            clock,
            registry: NoteRegistry::new(),
            scheduler: Scheduler::new(),
            router: InputRouter::new(),
            songs: SongBook::builtin(),
            timing: config.timing.clone(),
            base_octave: keyboard.octave.clamp(MIN_OCTAVE, MAX_OCTAVE),
            master_volume: keyboard.volume.clamp(0.0, 1.0),
            instrument: keyboard.instrument,
            sustain: keyboard.sustain,
            mode: Mode::Idle,
            take: Take::default(),
            light_timer: None,
            next_light: 0,
        }
    }

    // ----------------------------------------------------------------------
    // Accessors

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.mode, Mode::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording(_))
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.mode, Mode::Playing(_))
    }

    pub fn is_song_playing(&self) -> bool {
        matches!(self.mode, Mode::SongPlaying(_))
    }

    pub fn is_teaching(&self) -> bool {
        matches!(self.mode, Mode::Teaching(_))
    }

    pub fn teaching_state(&self) -> TeachingState {
        match &self.mode {
            Mode::Teaching(lesson) => lesson.state(),
            _ => TeachingState::Idle,
        }
    }

    /// The last finished recording
    pub fn take(&self) -> &Take {
        &self.take
    }

    pub fn has_audio(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Engine access for rendering
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn registry(&self) -> &NoteRegistry {
        &self.registry
    }

    pub fn songs(&self) -> &SongBook {
        &self.songs
    }

    /// Add a song to the song book, replacing one with the same id
    pub fn add_song(&mut self, song: Song) {
        debug!(id = song.id(), "song added");
        self.songs.insert(song);
    }

    /// Whether `key` currently has a live voice
    pub fn is_note_active(&mut self, key: NoteKey) -> bool {
        match self.engine.as_ref() {
            Some(engine) => self.registry.is_active(engine, key),
            None => false,
        }
    }

    // ----------------------------------------------------------------------
    // Settings

    pub fn base_octave(&self) -> u8 {
        self.base_octave
    }

    pub fn set_octave(&mut self, octave: u8) -> Result<(), PianoError> {
        self.base_octave = validate_octave(octave)?;
        debug!(octave, "octave changed");
        Ok(())
    }

    /// Move the base octave up one step. Returns false at the top.
    pub fn octave_up(&mut self) -> bool {
        if self.base_octave >= MAX_OCTAVE {
            return false;
        }
        self.base_octave += 1;
        debug!(octave = self.base_octave, "octave changed");
        true
    }

    /// Move the base octave down one step. Returns false at the bottom.
    pub fn octave_down(&mut self) -> bool {
        if self.base_octave <= MIN_OCTAVE {
            return false;
        }
        self.base_octave -= 1;
        debug!(octave = self.base_octave, "octave changed");
        true
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set the master volume, clamped to 0.0..=1.0
    pub fn set_master_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Select the instrument for new notes. Releases use the instrument
    /// selected at release time.
    pub fn set_instrument(&mut self, instrument: Instrument) {
        self.instrument = instrument;
        debug!(%instrument, "instrument changed");
    }

    pub fn sustain_mode(&self) -> bool {
        self.sustain
    }

    /// Turn sustain on or off. Turning it off fades every sustained note.
    pub fn set_sustain_mode(&mut self, on: bool) {
        if self.sustain == on {
            return;
        }
        self.sustain = on;
        debug!(on, "sustain mode");
        if !on {
            if let Some(engine) = self.engine.as_mut() {
                self.registry
                    .release_all_sustained(engine, ms_to_secs(self.timing.sustain_release_ms));
            }
        }
    }

    // ----------------------------------------------------------------------
    // Notes

    /// Start a note from live input
    pub fn start_note(&mut self, key: NoteKey) {
        self.note_on(key, false);
        self.presentation.highlight(key, true);
    }

    /// Stop a note from live input
    pub fn stop_note(&mut self, key: NoteKey) {
        self.note_off(key, false);
        self.presentation.highlight(key, false);
    }

    /// Sound `key`. Synthetic notes (playback, songs) are never recorded.
    fn note_on(&mut self, key: NoteKey, synthetic: bool) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        let tone = Tone {
            frequency: key.frequency(self.base_octave),
            profile: self.instrument.profile(),
            master_volume: self.master_volume,
            sustain: self.sustain,
        };
        if self.registry.note_on(engine, key, tone).is_none() {
            return false;
        }

        if !synthetic {
            self.record(EventKind::On, key);
        }
        true
    }

    fn note_off(&mut self, key: NoteKey, synthetic: bool) {
        if !synthetic {
            self.record(EventKind::Off, key);
        }

        let release = self.instrument.profile().release;
        if let Some(engine) = self.engine.as_mut() {
            self.registry.note_off(engine, key, release);
        }
    }

    fn record(&mut self, kind: EventKind, key: NoteKey) {
        if let Mode::Recording(recorder) = &mut self.mode {
            recorder.record(kind, key, self.base_octave, self.clock.now_ms());
        }
    }

    /// Hard-stop every voice and un-press every key
    fn clear_voices(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            self.registry.clear_all(engine);
        }
        self.presentation.clear_highlights();
    }

    // ----------------------------------------------------------------------
    // Input

    /// Physical key press (`KeyboardEvent.code` naming)
    pub fn key_down(&mut self, code: &str, repeat: bool) {
        let teaching = self.is_teaching();
        if let Some(route) = self.router.key_down(code, repeat, teaching) {
            self.route(route);
        }
    }

    pub fn key_up(&mut self, code: &str) {
        let teaching = self.is_teaching();
        if let Some(route) = self.router.key_up(code, teaching) {
            self.route(route);
        }
    }

    /// Pointer pressed on a rendered key
    pub fn pointer_down(&mut self, key: NoteKey) {
        let teaching = self.is_teaching();
        let route = self.router.pointer_down(key, teaching);
        self.route(route);
    }

    pub fn pointer_up(&mut self, key: NoteKey) {
        let teaching = self.is_teaching();
        if let Some(route) = self.router.pointer_up(key, teaching) {
            self.route(route);
        }
    }

    pub fn pointer_leave(&mut self, key: NoteKey) {
        let teaching = self.is_teaching();
        if let Some(route) = self.router.pointer_leave(key, teaching) {
            self.route(route);
        }
    }

    fn route(&mut self, route: Route) {
        match route {
            Route::Play(key) => self.start_note(key),
            Route::Release(key) => self.stop_note(key),
            Route::Teach(key) => self.teach_input(key),
        }
    }

    /// Window minimized or closed: silence everything and leave any mode
    pub fn suspend(&mut self) {
        self.clear_voices();
        self.stop_recording();
        self.stop_playback();
        self.stop_song();
        self.stop_teaching();
        self.router.reset();
        debug!("suspended");
    }

    // ----------------------------------------------------------------------
    // Timers

    /// Fire every timer that is due. Returns how many fired.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some(due) = self.scheduler.pop_due(now) {
            self.dispatch(due.at_ms, due.task);
            fired += 1;
        }
        fired
    }

    /// When the next timer is due, if any
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// Number of timers pending for a mode
    pub fn pending_timers(&self, owner: Owner) -> usize {
        self.scheduler.pending(owner)
    }

    /// Run one task. `at` is the time it was due, so follow-up timers are
    /// placed relative to the schedule rather than to a late wakeup.
    fn dispatch(&mut self, at: u64, task: Task) {
        match task {
            Task::PlaybackStep => self.playback_step(),
            Task::SongStep => self.song_step(at),
            Task::SongNoteOff(key) => {
                self.note_off(key, true);
                self.presentation.highlight(key, false);
            }
            Task::SongFinish => self.stop_song(),
            Task::TeachingCue => self.show_cue(at),
            Task::TeachingLight(key) => {
                self.light_timer = None;
                let still_target = match &self.mode {
                    Mode::Teaching(lesson) => lesson.target() == Some(key),
                    _ => false,
                };
                if still_target {
                    self.drop_light(key, at);
                }
            }
            Task::TeachingLightExpire(light) => self.presentation.remove_falling_light(light),
            Task::TeachingRelease(key) => self.note_off(key, false),
            Task::TeachingFlashEnd(key, feedback) => self.presentation.clear_flash(key, feedback),
            Task::TeachingRestorePrompt => {
                if let Some(prompt) = self.prompt() {
                    self.presentation.set_message(Some(&prompt));
                }
            }
            Task::TeachingFinish => self.stop_teaching(),
        }
    }

    // ----------------------------------------------------------------------
    // Recording and playback

    /// Start a new recording, discarding the previous take
    pub fn start_recording(&mut self) {
        if !self.is_idle() {
            debug!(mode = ?self.mode, "start_recording rejected");
            return;
        }
        self.take = Take::default();
        self.mode = Mode::Recording(Recorder::new(self.clock.now_ms()));
        self.presentation.set_status(Some(&Status::Recording));
        info!("recording started");
    }

    pub fn stop_recording(&mut self) {
        if !self.is_recording() {
            return;
        }
        if let Mode::Recording(recorder) = mem::replace(&mut self.mode, Mode::Idle) {
            self.take = recorder.finish();
        }
        self.show_take_summary();
        info!(
            events = self.take.events().len(),
            notes = self.take.note_count(),
            "recording stopped"
        );
    }

    fn show_take_summary(&mut self) {
        let status = self.take.summary().map(Status::Recorded);
        self.presentation.set_status(status.as_ref());
    }

    /// Replay the last take with its original timing
    pub fn play_recording(&mut self) {
        if !self.is_idle() {
            debug!(mode = ?self.mode, "play_recording rejected");
            return;
        }
        if self.take.is_empty() {
            debug!("nothing recorded");
            return;
        }

        self.mode = Mode::Playing(PlaybackCursor::new(self.clock.now_ms()));
        self.presentation.set_status(Some(&Status::Playing));
        info!(events = self.take.events().len(), "playback started");
        self.schedule_playback();
    }

    /// Queue the next recorded event at its absolute target time
    fn schedule_playback(&mut self) {
        let Mode::Playing(cursor) = &self.mode else {
            return;
        };
        match cursor.next_due(&self.take) {
            Some(at) => {
                self.scheduler.schedule_at(Owner::Playback, at, Task::PlaybackStep);
            }
            None => self.stop_playback(),
        }
    }

    fn playback_step(&mut self) {
        let event = match &mut self.mode {
            Mode::Playing(cursor) => cursor.advance(&self.take),
            _ => return,
        };
        if let Some(event) = event {
            self.replay(event);
        }
        self.schedule_playback();
    }

    /// Play one recorded event in the octave it was recorded in
    fn replay(&mut self, event: RecordedEvent) {
        let saved = mem::replace(&mut self.base_octave, event.octave);
        match event.kind {
            EventKind::On => {
                self.note_on(event.key, true);
                self.presentation.highlight(event.key, true);
            }
            EventKind::Off => {
                self.note_off(event.key, true);
                self.presentation.highlight(event.key, false);
            }
        }
        self.base_octave = saved;
    }

    /// Stop playback. Notes already sounding fade out normally.
    pub fn stop_playback(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.scheduler.cancel_owner(Owner::Playback);
        self.mode = Mode::Idle;
        self.show_take_summary();
        self.presentation.clear_highlights();
        info!("playback stopped");
    }

    // ----------------------------------------------------------------------
    // Songs

    /// Play a song from the song book. While a song plays this stops it.
    pub fn play_song(&mut self, id: &str) {
        match self.mode {
            Mode::SongPlaying(_) => {
                self.stop_song();
                return;
            }
            Mode::Idle => {}
            _ => {
                debug!(mode = ?self.mode, "play_song rejected");
                return;
            }
        }

        let Some(song) = self.songs.get(id).cloned() else {
            error!(id, "{}", PianoError::UnknownSong(id.to_string()));
            return;
        };

        info!(id, name = song.name(), "song started");
        self.presentation.set_status(Some(&Status::Song {
            name: song.name().to_string(),
        }));
        self.mode = Mode::SongPlaying(SongRun::new(song));
        let now = self.clock.now_ms();
        self.song_step(now);
    }

    fn song_step(&mut self, at: u64) {
        let cue = match &mut self.mode {
            Mode::SongPlaying(run) => run.advance(),
            _ => return,
        };

        match cue {
            None => self.stop_song(),
            Some(Cue::Rest { wait_ms }) => {
                self.scheduler
                    .schedule_in(Owner::Song, at, wait_ms, Task::SongStep);
            }
            Some(Cue::Note { key, hold_ms, next }) => {
                self.note_on(key, true);
                self.presentation.highlight(key, true);
                self.scheduler
                    .schedule_in(Owner::Song, at, hold_ms, Task::SongNoteOff(key));
                let (delay, task) = match next {
                    Next::After(delay) => (delay, Task::SongStep),
                    Next::End(delay) => (delay, Task::SongFinish),
                };
                self.scheduler.schedule_in(Owner::Song, at, delay, task);
            }
        }
    }

    /// Stop the song, cancel its timers and silence every voice
    pub fn stop_song(&mut self) {
        if !self.is_song_playing() {
            return;
        }
        self.scheduler.cancel_owner(Owner::Song);
        self.mode = Mode::Idle;
        self.presentation.set_status(None);
        self.clear_voices();
        info!("song stopped");
    }

    // ----------------------------------------------------------------------
    // Teaching

    /// Start a lesson on a song. While a lesson runs this stops it.
    pub fn start_teaching(&mut self, id: &str) {
        match self.mode {
            Mode::Teaching(_) => {
                self.stop_teaching();
                return;
            }
            Mode::Idle => {}
            _ => {
                debug!(mode = ?self.mode, "start_teaching rejected");
                return;
            }
        }

        let Some(song) = self.songs.get(id) else {
            error!(id, "{}", PianoError::UnknownSong(id.to_string()));
            return;
        };
        let Some(lesson) = Lesson::new(song) else {
            warn!(id, "song has no notes to teach");
            return;
        };

        info!(id, notes = lesson.len(), "teaching started");
        self.presentation.set_message(Some(&Message::TeachingStarted {
            song: lesson.song_name().to_string(),
        }));
        self.clear_voices();
        self.mode = Mode::Teaching(lesson);
        let now = self.clock.now_ms();
        self.show_cue(now);
    }

    /// Leave teaching mode, dropping every teaching timer and indicator
    pub fn stop_teaching(&mut self) {
        if !self.is_teaching() {
            return;
        }
        let cancelled = self.scheduler.cancel_owner(Owner::Teaching);
        self.light_timer = None;
        self.mode = Mode::Idle;
        self.presentation.set_message(None);
        self.presentation.clear_indicators();
        self.clear_voices();
        info!(cancelled, "teaching stopped");
    }

    fn prompt(&self) -> Option<Message> {
        let Mode::Teaching(lesson) = &self.mode else {
            return None;
        };
        let target = lesson.target()?;
        Some(Message::Prompt {
            number: lesson.index() + 1,
            total: lesson.len(),
            pitch: target.pitch,
        })
    }

    /// Point at the current target key
    fn show_cue(&mut self, now: u64) {
        let target = match &self.mode {
            Mode::Teaching(lesson) => lesson.target(),
            _ => None,
        };
        let Some(target) = target else {
            return;
        };

        self.presentation.clear_indicators();
        if let Some(timer) = self.light_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.presentation.add_cue(target);
        self.drop_light(target, now);
        if let Some(prompt) = self.prompt() {
            self.presentation.set_message(Some(&prompt));
        }
    }

    /// Add a falling light over `key` and queue its removal and the next one
    fn drop_light(&mut self, key: NoteKey, now: u64) {
        let light = LightId(self.next_light);
        self.next_light += 1;
        self.presentation.add_falling_light(key, light);

        // A zero delay would refire within the same tick forever
        let repeat = self.timing.cue_repeat_ms.max(1);
        self.scheduler.schedule_in(
            Owner::Teaching,
            now,
            repeat,
            Task::TeachingLightExpire(light),
        );
        self.light_timer = Some(self.scheduler.schedule_in(
            Owner::Teaching,
            now,
            repeat,
            Task::TeachingLight(key),
        ));
    }

    fn teach_input(&mut self, key: NoteKey) {
        let verdict = match &mut self.mode {
            Mode::Teaching(lesson) => lesson.submit(key),
            _ => return,
        };
        let now = self.clock.now_ms();

        match verdict {
            Verdict::Ignored => {}
            Verdict::Correct { .. } | Verdict::Finished => {
                self.presentation.remove_cue(key);
                self.sound_feedback(key, Feedback::Correct, now);
                if let Some(timer) = self.light_timer.take() {
                    self.scheduler.cancel(timer);
                }

                if verdict == Verdict::Finished {
                    let song = match &self.mode {
                        Mode::Teaching(lesson) => lesson.song_name().to_string(),
                        _ => String::new(),
                    };
                    info!(song = %song, "lesson completed");
                    self.presentation
                        .set_message(Some(&Message::Completed { song }));
                    self.scheduler.schedule_in(
                        Owner::Teaching,
                        now,
                        self.timing.completion_ms,
                        Task::TeachingFinish,
                    );
                } else {
                    self.scheduler.schedule_in(
                        Owner::Teaching,
                        now,
                        self.timing.cue_pause_ms,
                        Task::TeachingCue,
                    );
                }
            }
            Verdict::Wrong { expected } => {
                debug!(%key, %expected, "wrong key");
                self.sound_feedback(key, Feedback::Wrong, now);
                self.presentation.set_message(Some(&Message::WrongKey));
                self.scheduler.schedule_in(
                    Owner::Teaching,
                    now,
                    self.timing.error_message_ms,
                    Task::TeachingRestorePrompt,
                );
            }
        }
    }

    /// Sound the pressed key briefly and flash it
    fn sound_feedback(&mut self, key: NoteKey, feedback: Feedback, now: u64) {
        let (hold_ms, flash_ms) = match feedback {
            Feedback::Correct => (self.timing.correct_hold_ms, self.timing.correct_flash_ms),
            Feedback::Wrong => (self.timing.wrong_hold_ms, self.timing.wrong_flash_ms),
        };

        self.note_on(key, false);
        self.scheduler
            .schedule_in(Owner::Teaching, now, hold_ms, Task::TeachingRelease(key));
        self.presentation.flash(key, feedback);
        self.scheduler.schedule_in(
            Owner::Teaching,
            now,
            flash_ms,
            Task::TeachingFlashEnd(key, feedback),
        );
    }
}
