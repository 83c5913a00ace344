//! Voice Activity Detection used by the reference energy backend.
//!
//! The wake-word spotter and the endpointing intent engine share the same
//! `VoiceActivityDetector` contract, so either can be driven by a smarter
//! detector without touching the engines.

pub mod energy;

use crate::buffering::frame::AudioFrame;

/// Whether a given audio frame contains speech or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadDecision {
    /// The frame contains speech energy above threshold.
    Speech,
    /// The frame is silent (or below threshold, including hangover period).
    Silence,
}

impl VadDecision {
    pub fn is_speech(self) -> bool {
        self == VadDecision::Speech
    }
}

/// Trait for all VAD implementations.
///
/// Implementors may be stateful (hangover counters, smoothing windows, etc.).
pub trait VoiceActivityDetector: Send + 'static {
    /// Classify one frame.
    fn classify(&mut self, frame: &AudioFrame) -> VadDecision;

    /// Reset any internal state.
    fn reset(&mut self);
}
