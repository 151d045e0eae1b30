//! Tone engine: starts and stops single sounding voices
//!
//! `ToneEngine` is the port the piano core drives. `SynthEngine` is the
//! built-in implementation: each voice is an oscillator multiplied by a gain
//! envelope, and voices are mixed into frames by `render`. Audio time only
//! advances through `render`, so a host that wants voices to finish must keep
//! rendering.

use crate::error::PianoError;
use crate::generator::envelope::MIN_GAIN;
use crate::generator::{GainEnvelope, GeneratorState, Oscillator, SignalGenerator};
use crate::pipeline::instrument::InstrumentProfile;

/// Peak gain at full master volume
pub const PEAK_GAIN: f32 = 0.3;
/// Extra time a self-terminating voice lives past its envelope
pub const TAIL_SECONDS: f64 = 0.1;

/// Supported sample rates (Hz)
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8000..=192_000;

/// Handle to one sounding voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Everything needed to start a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Frequency in Hz
    pub frequency: f64,
    pub profile: InstrumentProfile,
    /// Master volume (0.0 to 1.0)
    pub master_volume: f32,
    /// Sustain mode: hold at the sustain level until stopped
    pub sustain: bool,
}

/// Something that can start and stop voices
pub trait ToneEngine {
    /// Start a voice for `tone`. The envelope is fully scheduled on start.
    fn start(&mut self, tone: Tone) -> VoiceId;

    /// Fade the voice to zero over `release` seconds, then free it.
    /// Stopping an unknown or already stopped voice does nothing.
    fn stop(&mut self, voice: VoiceId, release: f64);

    /// Whether the voice still exists and has not reached its end
    fn is_sounding(&self, voice: VoiceId) -> bool;
}

struct Voice {
    id: VoiceId,
    oscillator: Oscillator,
    envelope: GainEnvelope,
    /// Sample position the voice started at
    start_sample: u64,
    /// Absolute sample position the voice ends at, if scheduled
    end_sample: Option<u64>,
    stopped: bool,
    /// Oscillator reported `GeneratorState::Complete`
    complete: bool,
}

impl Voice {
    fn is_finished(&self, position: u64) -> bool {
        self.end_sample.is_some_and(|end| position >= end)
    }

    fn schedule_end(&mut self, end_sample: u64) {
        self.end_sample = Some(end_sample);
        self.oscillator
            .stop_after(end_sample.saturating_sub(self.start_sample));
    }
}

/// Oscillator + envelope voice mixer
pub struct SynthEngine {
    sample_rate: u32,
    /// Samples rendered so far
    position: u64,
    voices: Vec<Voice>,
    next_id: u64,
    /// Scratch buffers reused between frames
    voice_buffer: Vec<f32>,
    gain_buffer: Vec<f32>,
}

impl SynthEngine {
    /// Create an engine rendering at `sample_rate`
    ///
    /// Fails with `UnsupportedAudio` when the rate is outside
    /// `SAMPLE_RATE_RANGE`.
    pub fn new(sample_rate: u32) -> Result<Self, PianoError> {
        if !SAMPLE_RATE_RANGE.contains(&sample_rate) {
            return Err(PianoError::UnsupportedAudio(format!(
                "sample rate {} Hz outside {}-{} Hz",
                sample_rate,
                SAMPLE_RATE_RANGE.start(),
                SAMPLE_RATE_RANGE.end()
            )));
        }
        Ok(Self {
            sample_rate,
            position: 0,
            voices: Vec::new(),
            next_id: 0,
            voice_buffer: Vec::new(),
            gain_buffer: Vec::new(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current audio time in seconds
    pub fn current_time(&self) -> f64 {
        self.position as f64 / f64::from(self.sample_rate)
    }

    fn seconds_to_samples(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * f64::from(self.sample_rate)).ceil() as u64
    }

    /// Number of voices still held by the engine, including fading ones
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Current gain of a voice
    pub fn gain(&self, voice: VoiceId) -> Option<f32> {
        let now = self.current_time();
        self.find(voice).map(|v| v.envelope.value_at(now))
    }

    /// Gain automation of a voice
    pub fn envelope(&self, voice: VoiceId) -> Option<&GainEnvelope> {
        self.find(voice).map(|v| &v.envelope)
    }

    fn find(&self, voice: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == voice)
    }

    /// Render one frame, mixing all voices
    ///
    /// Voices whose oscillator completed during the frame are removed after it.
    pub fn render(&mut self, buffer: &mut [f32]) {
        buffer.fill(0.0);

        let frame_len = buffer.len();
        self.voice_buffer.resize(frame_len, 0.0);
        self.gain_buffer.resize(frame_len, 0.0);
        let start_time = self.current_time();

        for voice in self.voices.iter_mut() {
            let state = voice.oscillator.process(&mut self.voice_buffer);
            voice.complete = state == GeneratorState::Complete;
            voice
                .envelope
                .fill(&mut self.gain_buffer, start_time, self.sample_rate);

            for ((out, &s), &g) in buffer
                .iter_mut()
                .zip(self.voice_buffer.iter())
                .zip(self.gain_buffer.iter())
            {
                *out += s * g;
            }
        }

        self.position += frame_len as u64;
        self.voices.retain(|v| !v.complete);

        for sample in buffer.iter_mut() {
            *sample = soft_clip(*sample);
        }
    }
}

impl ToneEngine for SynthEngine {
    fn start(&mut self, tone: Tone) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;

        let profile = tone.profile;
        let volume = tone.master_volume.clamp(0.0, 1.0);
        let peak = volume * PEAK_GAIN;
        let sustain_level = volume * profile.sustain;

        let now = self.current_time();
        let attack_end = now + profile.attack;
        let decay_end = attack_end + profile.decay;

        let mut envelope = GainEnvelope::new(0.0);
        envelope.set_value_at(0.0, now);
        envelope.linear_ramp_to(peak, attack_end);

        if tone.sustain {
            envelope.exponential_ramp_to(sustain_level, decay_end);
        } else if profile.sustain_plateau {
            envelope.exponential_ramp_to(sustain_level, decay_end);
            envelope.exponential_ramp_to(MIN_GAIN, decay_end + profile.release);
        } else {
            envelope.exponential_ramp_to(MIN_GAIN, decay_end);
        }
        let natural_length = (!tone.sustain).then(|| profile.natural_length());

        let mut voice = Voice {
            id,
            oscillator: Oscillator::new(profile.waveform, tone.frequency, self.sample_rate),
            envelope,
            start_sample: self.position,
            end_sample: None,
            stopped: false,
            complete: false,
        };
        if let Some(length) = natural_length {
            let end_sample = self.position + self.seconds_to_samples(length + TAIL_SECONDS);
            voice.schedule_end(end_sample);
        }
        self.voices.push(voice);
        id
    }

    fn stop(&mut self, voice: VoiceId, release: f64) {
        let now = self.current_time();
        let position = self.position;
        let end_sample = position + self.seconds_to_samples(release);

        let Some(v) = self.voices.iter_mut().find(|v| v.id == voice) else {
            return;
        };
        if v.stopped || v.is_finished(position) {
            return;
        }

        let current = v.envelope.value_at(now);
        v.envelope.cancel_scheduled_values(now);
        v.envelope.set_value_at(current, now);
        v.envelope.linear_ramp_to(0.0, now + release.max(0.0));
        v.stopped = true;

        // Replaces the natural end: the release ramp always runs to zero
        v.schedule_end(end_sample);

        if v.is_finished(position) {
            self.voices.retain(|v| v.id != voice);
        }
    }

    fn is_sounding(&self, voice: VoiceId) -> bool {
        self.find(voice)
            .is_some_and(|v| !v.is_finished(self.position))
    }
}

/// Soft clipping to prevent distortion
/// Uses a gentle tanh-like curve for values above threshold
fn soft_clip(sample: f32) -> f32 {
    if sample.abs() <= 1.0 {
        sample
    } else {
        sample.signum() * (1.0 + (sample.abs() - 1.0).tanh() * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::instrument::Instrument;

    const RATE: u32 = 8000;

    fn tone(instrument: Instrument, sustain: bool) -> Tone {
        Tone {
            frequency: 440.0,
            profile: instrument.profile(),
            master_volume: 0.7,
            sustain,
        }
    }

    fn render_seconds(engine: &mut SynthEngine, seconds: f64) {
        let mut buffer = vec![0.0f32; 64];
        let frames = (seconds * f64::from(RATE) / 64.0).ceil() as usize;
        for _ in 0..frames {
            engine.render(&mut buffer);
        }
    }

    #[test]
    fn test_unsupported_sample_rate() {
        assert!(matches!(
            SynthEngine::new(100),
            Err(PianoError::UnsupportedAudio(_))
        ));
        assert!(SynthEngine::new(44100).is_ok());
    }

    #[test]
    fn test_attack_reaches_peak() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Organ, true));
        let env = engine.envelope(id).unwrap();
        let peak = 0.7 * PEAK_GAIN;
        assert!((env.value_at(0.001) - peak).abs() < 1e-5);
        assert_eq!(engine.gain(id), Some(0.0));
    }

    #[test]
    fn test_piano_self_terminates() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Piano, false));
        assert!(engine.is_sounding(id));

        // 0.01 + 0.8 + tail
        render_seconds(&mut engine, 0.85);
        assert!(engine.is_sounding(id));
        render_seconds(&mut engine, 0.1);
        assert!(!engine.is_sounding(id));
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_plateau_profile_releases_after_sustain() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Organ, false));
        let env = engine.envelope(id).unwrap();
        assert!((env.value_at(0.101) - 0.56).abs() < 1e-4);
        assert!((env.value_at(0.301) - MIN_GAIN).abs() < 1e-5);

        render_seconds(&mut engine, 0.45);
        assert!(!engine.is_sounding(id));
    }

    #[test]
    fn test_sustain_mode_holds() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Organ, true));
        render_seconds(&mut engine, 2.0);
        assert!(engine.is_sounding(id));
        let gain = engine.gain(id).unwrap();
        assert!((gain - 0.56).abs() < 1e-4, "gain {}", gain);
    }

    #[test]
    fn test_stop_ramps_from_current_gain() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Organ, true));
        render_seconds(&mut engine, 0.5);
        let before = engine.gain(id).unwrap();

        engine.stop(id, 0.2);
        assert!(engine.is_sounding(id));
        assert!((engine.gain(id).unwrap() - before).abs() < 1e-6);

        let half = engine.current_time() + 0.1;
        let mid = engine.envelope(id).unwrap().value_at(half);
        assert!((mid - before / 2.0).abs() < 1e-3);

        render_seconds(&mut engine, 0.25);
        assert!(!engine.is_sounding(id));
    }

    #[test]
    fn test_release_outlives_natural_end() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let mut t = tone(Instrument::Electric, false);
        t.master_volume = 1.0;
        let id = engine.start(t);

        // Natural end would be 0.02 + 0.2 + 0.6 + tail = 0.92 s
        render_seconds(&mut engine, 0.5);
        let stopped_at = engine.current_time();
        let release = Instrument::Electric.profile().release;
        engine.stop(id, release);

        render_seconds(&mut engine, 0.55);
        assert!(engine.current_time() > 0.92);
        assert!(engine.current_time() < stopped_at + release);
        assert!(engine.is_sounding(id));
        assert!(engine.gain(id).unwrap() > 0.0);

        render_seconds(&mut engine, 0.1);
        assert!(!engine.is_sounding(id));
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Organ, true));
        engine.stop(id, 0.3);
        let events = engine.envelope(id).unwrap().events().to_vec();
        engine.stop(id, 1.0);
        assert_eq!(engine.envelope(id).unwrap().events(), events.as_slice());

        // Unknown voices are ignored
        engine.stop(VoiceId(99), 0.1);
    }

    #[test]
    fn test_zero_release_frees_immediately() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        let id = engine.start(tone(Instrument::Synthesizer, true));
        engine.stop(id, 0.0);
        assert!(!engine.is_sounding(id));
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn test_render_mixes_and_clips() {
        let mut engine = SynthEngine::new(RATE).unwrap();
        for _ in 0..12 {
            let mut t = tone(Instrument::Synthesizer, true);
            t.master_volume = 1.0;
            engine.start(t);
        }
        assert_eq!(engine.voice_count(), 12);

        let mut buffer = vec![0.0f32; 512];
        engine.render(&mut buffer);
        assert!(buffer.iter().any(|s| s.abs() > 0.0));
        assert!(buffer.iter().all(|s| s.abs() <= 1.5));
    }

    #[test]
    fn test_soft_clip() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert_eq!(soft_clip(-1.0), -1.0);
        assert!(soft_clip(3.0) < 1.5);
        assert!(soft_clip(-3.0) > -1.5);
    }
}
