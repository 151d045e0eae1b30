pub mod envelope;
pub mod oscillator;

pub use envelope::{Automation, GainEnvelope, RampShape};
pub use oscillator::{Oscillator, Waveform};

/// Represents the current state of a signal generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Generator is still producing samples
    Running,
    /// Generator has completed and will produce no more samples
    Complete,
}

/// Core trait for all signal generators
///
/// Signal generators produce audio samples frame by frame.
/// Each generator is independent and can run in parallel with others.
pub trait SignalGenerator {
    /// Process the next frame of samples
    ///
    /// # Arguments
    /// * `buffer` - Mutable slice to write samples into. The length determines frame size.
    ///
    /// # Returns
    /// * `GeneratorState::Running` if the generator is still active
    /// * `GeneratorState::Complete` if the generator has finished
    ///
    /// # Note
    /// Even when Complete is returned, the buffer should still be filled with valid samples
    /// (zeros past the end) for the current frame.
    fn process(&mut self, buffer: &mut [f32]) -> GeneratorState;

    /// Check if this generator has completed
    fn is_complete(&self) -> bool;

    /// Reset the generator to its initial state
    fn reset(&mut self);
}
