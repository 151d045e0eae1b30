//! Gain envelope built from scheduled automation events
//!
//! The envelope is a timeline of value changes addressed in seconds of audio
//! time:
//! - `set_value_at`: jump to a value at a time
//! - `linear_ramp_to`: ramp linearly from the previous event to a value
//! - `exponential_ramp_to`: ramp exponentially from the previous event to a value
//!
//! A ramp always starts at the time and value of the event before it, so an
//! attack/decay/release shape is just a sequence of ramps. Pending events can
//! be cancelled from a point in time, which is how a release is started from
//! whatever gain the voice currently has.

/// Smallest gain an exponential ramp may target ("near-zero")
pub const MIN_GAIN: f32 = 0.001;

/// Interpolation used to reach an automation event's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    /// Jump at the event time, hold before it
    Step,
    Linear,
    Exponential,
}

/// A single scheduled value change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Automation {
    pub shape: RampShape,
    /// Time in seconds at which `value` is reached
    pub time: f64,
    pub value: f32,
}

/// Automation timeline for a voice's gain
#[derive(Debug, Clone, Default)]
pub struct GainEnvelope {
    events: Vec<Automation>,
    default_value: f32,
}

impl GainEnvelope {
    /// Create an empty envelope holding `default_value` until the first event
    pub fn new(default_value: f32) -> Self {
        Self {
            events: Vec::new(),
            default_value,
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(Automation {
            shape: RampShape::Step,
            time,
            value,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(Automation {
            shape: RampShape::Linear,
            time: end_time,
            value,
        });
    }

    /// Schedule an exponential ramp. Targets are clamped to `MIN_GAIN` since
    /// an exponential curve cannot reach zero.
    pub fn exponential_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(Automation {
            shape: RampShape::Exponential,
            time: end_time,
            value: value.max(MIN_GAIN),
        });
    }

    /// Remove every event scheduled at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time < time);
    }

    pub fn events(&self) -> &[Automation] {
        &self.events
    }

    /// Time of the last scheduled event, if any
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time)
    }

    // Keeps events ordered by time; equal times keep insertion order
    fn insert(&mut self, event: Automation) {
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }

    /// Gain value at time `t` (seconds)
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_time = 0.0;
        let mut prev_value = self.default_value;

        for event in &self.events {
            if event.time <= t {
                prev_time = event.time;
                prev_value = event.value;
                continue;
            }

            // First event still in the future: interpolate towards it
            let span = event.time - prev_time;
            if span <= 0.0 {
                return prev_value;
            }
            let progress = ((t - prev_time) / span).clamp(0.0, 1.0);
            return match event.shape {
                RampShape::Step => prev_value,
                RampShape::Linear => {
                    prev_value + (event.value - prev_value) * progress as f32
                }
                RampShape::Exponential => {
                    if prev_value <= 0.0 || event.value <= 0.0 {
                        prev_value
                    } else {
                        let ratio = f64::from(event.value) / f64::from(prev_value);
                        (f64::from(prev_value) * ratio.powf(progress)) as f32
                    }
                }
            };
        }

        prev_value
    }

    /// Fill `buffer` with gain values for consecutive samples starting at `start_time`
    pub fn fill(&self, buffer: &mut [f32], start_time: f64, sample_rate: u32) {
        let dt = 1.0 / f64::from(sample_rate.max(1));
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample = self.value_at(start_time + i as f64 * dt);
        }
    }
}
