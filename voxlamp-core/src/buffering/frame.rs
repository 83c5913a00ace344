//! Fixed-length PCM frame handed from an audio source to exactly one engine.

/// Samples per frame expected by both recognition engines (32 ms at 16 kHz).
pub const DEFAULT_FRAME_LENGTH: usize = 512;

/// Engine sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// A block of mono signed 16-bit samples at a known sample rate.
///
/// Sources own their frame storage and lend it out per cycle; the length is
/// fixed at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Box<[i16]>,
    sample_rate: u32,
}

impl AudioFrame {
    /// A zeroed frame of `len` samples.
    pub fn silent(len: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![0; len].into_boxed_slice(),
            sample_rate,
        }
    }

    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Mutable access for sources refilling the frame in place.
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the duration of this frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Root-mean-square level normalised to [0.0, 1.0].
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|s| {
                let v = *s as f64 / 32768.0;
                v * v
            })
            .sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }
}

/// Convert a normalised f32 sample to i16 with clipping.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
