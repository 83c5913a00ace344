//! Energy-based VAD using RMS threshold + hangover counter.
//!
//! ## Algorithm
//!
//! 1. Compute the normalised RMS of the incoming frame.
//! 2. If RMS ≥ `threshold` → emit `Speech`, reload the hangover counter.
//! 3. If RMS < `threshold` and hangover counter > 0 → emit `Speech`,
//!    decrement counter (keeps short inter-word gaps inside one utterance).
//! 4. Otherwise → emit `Silence`.

use super::{VadDecision, VoiceActivityDetector};
use crate::buffering::frame::AudioFrame;

/// A simple energy-based voice activity detector.
#[derive(Debug, Clone)]
pub struct EnergyVad {
    /// RMS threshold in [0, 1]. Typical range: 0.01–0.05.
    threshold: f32,
    /// Below-threshold frames still reported as `Speech` after real speech.
    hangover_frames: u32,
    hangover_counter: u32,
}

impl EnergyVad {
    /// Create a new `EnergyVad`.
    ///
    /// - `threshold`: normalised RMS above which a frame is speech. Default `0.02`.
    /// - `hangover_frames`: silent frames to extend speech. Default `4`
    ///   (≈ 128 ms at 32 ms frames).
    pub fn new(threshold: f32, hangover_frames: u32) -> Self {
        Self {
            threshold,
            hangover_frames,
            hangover_counter: 0,
        }
    }
}

impl Default for EnergyVad {
    fn default() -> Self {
        Self::new(0.02, 4)
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn classify(&mut self, frame: &AudioFrame) -> VadDecision {
        if frame.rms() >= self.threshold {
            self.hangover_counter = self.hangover_frames;
            VadDecision::Speech
        } else if self.hangover_counter > 0 {
            self.hangover_counter -= 1;
            VadDecision::Speech
        } else {
            VadDecision::Silence
        }
    }

    fn reset(&mut self) {
        self.hangover_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_frame() -> AudioFrame {
        AudioFrame::silent(512, 16_000)
    }

    fn loud_frame(amplitude: i16) -> AudioFrame {
        AudioFrame::from_samples(vec![amplitude; 512], 16_000)
    }

    #[test]
    fn silence_below_threshold() {
        let mut vad = EnergyVad::new(0.02, 0);
        assert_eq!(vad.classify(&silent_frame()), VadDecision::Silence);
    }

    #[test]
    fn speech_above_threshold() {
        let mut vad = EnergyVad::new(0.02, 0);
        assert_eq!(vad.classify(&loud_frame(8_000)), VadDecision::Speech);
    }

    #[test]
    fn hangover_extends_speech() {
        let mut vad = EnergyVad::new(0.02, 2);
        assert_eq!(vad.classify(&loud_frame(8_000)), VadDecision::Speech);
        assert_eq!(vad.classify(&silent_frame()), VadDecision::Speech);
        assert_eq!(vad.classify(&silent_frame()), VadDecision::Speech);
        assert_eq!(vad.classify(&silent_frame()), VadDecision::Silence);
    }

    #[test]
    fn reset_clears_hangover() {
        let mut vad = EnergyVad::new(0.02, 5);
        vad.classify(&loud_frame(8_000));
        vad.reset();
        assert_eq!(vad.classify(&silent_frame()), VadDecision::Silence);
    }

    #[test]
    fn empty_frame_is_silence() {
        let mut vad = EnergyVad::default();
        let frame = AudioFrame::from_samples(vec![], 16_000);
        assert_eq!(vad.classify(&frame), VadDecision::Silence);
    }
}
