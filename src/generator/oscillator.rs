//! Basic waveform oscillator
//!
//! Produces one of four periodic shapes at a fixed frequency. The oscillator
//! runs until an optional stop sample is reached, after which it outputs
//! silence and reports `Complete`.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{GeneratorState, SignalGenerator};

/// Oscillator waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    /// Sample the waveform at a normalized phase in [0, 1)
    pub fn sample(&self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Triangle => {
                // Starts at 0, peaks at 0.25, troughs at 0.75
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Sawtooth => {
                if phase < 0.5 {
                    2.0 * phase
                } else {
                    2.0 * phase - 2.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        value as f32
    }

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-frequency oscillator with an optional stop point
pub struct Oscillator {
    waveform: Waveform,
    /// Phase increment per sample, in cycles
    increment: f64,
    phase: f64,
    position: u64,
    stop_at: Option<u64>,
}

impl Oscillator {
    /// Create a new oscillator
    ///
    /// # Arguments
    /// * `waveform` - Shape of the output
    /// * `frequency` - Frequency in Hz
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: u32) -> Self {
        Self {
            waveform,
            increment: frequency / f64::from(sample_rate.max(1)),
            phase: 0.0,
            position: 0,
            stop_at: None,
        }
    }

    /// Stop producing sound once `samples` samples have been generated in total.
    /// A later call replaces an earlier stop point.
    pub fn stop_after(&mut self, samples: u64) {
        self.stop_at = Some(samples);
    }

    pub fn stop_at(&self) -> Option<u64> {
        self.stop_at
    }

    /// Number of samples generated so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    fn is_stopped(&self) -> bool {
        self.stop_at.is_some_and(|stop| self.position >= stop)
    }
}

impl SignalGenerator for Oscillator {
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState {
        for sample in buffer.iter_mut() {
            if self.is_stopped() {
                *sample = 0.0;
                continue;
            }
            *sample = self.waveform.sample(self.phase);
            self.phase = (self.phase + self.increment).fract();
            self.position += 1;
        }

        if self.is_stopped() {
            GeneratorState::Complete
        } else {
            GeneratorState::Running
        }
    }

    fn is_complete(&self) -> bool {
        self.is_stopped()
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.position = 0;
    }
}
