//! WAV-file [`AudioSource`] for bench runs and replaying recordings.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::{info, warn};

use super::AudioSource;
use crate::buffering::frame::AudioFrame;
use crate::error::{Result, VoxlampError};

/// Reads 16-bit mono PCM at the engine rate, one frame per call. A trailing
/// partial frame is dropped; the source then reports itself exhausted.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    frame: AudioFrame,
    exhausted: bool,
}

impl WavSource {
    pub fn open(path: &Path, frame_length: usize, sample_rate: u32) -> Result<Self> {
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels != 1
            || spec.bits_per_sample != 16
            || spec.sample_format != SampleFormat::Int
            || spec.sample_rate != sample_rate
        {
            return Err(VoxlampError::InvalidConfig(format!(
                "{} must be 16-bit mono PCM at {sample_rate} Hz (got {} ch, {} bit, {} Hz)",
                path.display(),
                spec.channels,
                spec.bits_per_sample,
                spec.sample_rate
            )));
        }

        info!(
            path = %path.display(),
            samples = reader.duration(),
            "wav source opened"
        );

        Ok(Self {
            reader,
            frame: AudioFrame::silent(frame_length, sample_rate),
            exhausted: false,
        })
    }
}

impl AudioSource for WavSource {
    fn frame_length(&self) -> usize {
        self.frame.len()
    }

    fn sample_rate(&self) -> u32 {
        self.frame.sample_rate()
    }

    fn try_next_frame(&mut self) -> Option<&AudioFrame> {
        if self.exhausted {
            return None;
        }

        let mut filled = 0;
        {
            let mut samples = self.reader.samples::<i16>();
            let out = self.frame.samples_mut();
            while filled < out.len() {
                match samples.next() {
                    Some(Ok(sample)) => {
                        out[filled] = sample;
                        filled += 1;
                    }
                    Some(Err(e)) => {
                        warn!("wav read error, ending input: {e}");
                        break;
                    }
                    None => break,
                }
            }
        }

        if filled < self.frame.len() {
            self.exhausted = true;
            return None;
        }
        Some(&self.frame)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
