//! Device-rate → engine-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Microphones commonly run at 44.1 or 48 kHz while both recognition engines
//! want 16 kHz. `RateConverter` runs on the pipeline thread and writes into a
//! caller-owned buffer, so steady-state use does not allocate.
//!
//! When the rates already match no rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::{error, info};

use crate::error::{Result, VoxlampError};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` in passthrough mode.
    resampler: Option<FastFixedIn<f32>>,
    /// Holds partial input blocks between calls.
    input_buf: Vec<f32>,
    /// Input frames rubato consumes per call.
    chunk_size: usize,
    /// `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// `VoxlampError::AudioDevice` if rubato rejects the ratio.
    pub fn new(capture_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if capture_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / capture_rate as f64;
        let resampler =
            FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, chunk_size, 1)
                .map_err(|e| VoxlampError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        info!(capture_rate, target_rate, chunk_size, max_out, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::with_capacity(chunk_size * 2),
            chunk_size,
            output_buf: vec![vec![0f32; max_out]; 1],
        })
    }

    /// Append the converted form of `samples` to `out`.
    ///
    /// Input is accumulated until a full `chunk_size` block is available, so a
    /// call may append nothing.
    pub fn process_into(&mut self, samples: &[f32], out: &mut Vec<f32>) {
        let Some(ref mut resampler) = self.resampler else {
            out.extend_from_slice(samples);
            return;
        };

        self.input_buf.extend_from_slice(samples);
        while self.input_buf.len() >= self.chunk_size {
            let block = &self.input_buf[..self.chunk_size];
            match resampler.process_into_buffer(&[block], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => out.extend_from_slice(&self.output_buf[0][..produced]),
                Err(e) => error!("resampler process error: {e}"),
            }
            self.input_buf.drain(..self.chunk_size);
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_appends_input() {
        let mut rc = RateConverter::new(16_000, 16_000, 480).expect("converter");
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..100).map(|i| i as f32 * 0.001).collect();
        let mut out = vec![9.0];
        rc.process_into(&samples, &mut out);
        assert_eq!(out.len(), 101);
        assert_eq!(&out[1..], samples.as_slice());
    }

    #[test]
    fn ratio_48k_to_16k_correct_length() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).expect("converter");
        assert!(!rc.is_passthrough());
        let mut out = Vec::new();
        rc.process_into(&vec![0.0f32; 960], &mut out);
        assert!(
            (out.len() as isize - 320).unsigned_abs() <= 10,
            "output len={} expected≈320",
            out.len()
        );
    }

    #[test]
    fn partial_blocks_accumulate() {
        let mut rc = RateConverter::new(44_100, 16_000, 960).expect("converter");
        let mut out = Vec::new();
        rc.process_into(&vec![0.0f32; 500], &mut out);
        assert!(out.is_empty());
        rc.process_into(&vec![0.0f32; 500], &mut out);
        assert!(!out.is_empty(), "second push completes a block");
    }
}
