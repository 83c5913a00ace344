//! Microphone-backed [`AudioSource`].

use std::sync::{atomic::AtomicBool, Arc};

use tracing::info;

use super::{resample::RateConverter, AudioCapture, AudioSource};
use crate::buffering::{
    create_sample_ring,
    frame::{f32_to_i16, AudioFrame},
    Consumer, SampleConsumer,
};
use crate::error::Result;

/// Samples drained from the ring per pull.
const DRAIN_CHUNK: usize = 960;

/// Assembles engine-rate i16 frames from a live capture stream.
///
/// Not `Send`: open it on the thread that runs the loop.
pub struct CaptureSource {
    capture: AudioCapture,
    consumer: SampleConsumer,
    resampler: RateConverter,
    drain: Vec<f32>,
    converted: Vec<f32>,
    pending: Vec<i16>,
    frame: AudioFrame,
}

impl CaptureSource {
    pub fn open(
        preferred_device: Option<&str>,
        frame_length: usize,
        sample_rate: u32,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let (producer, consumer) = create_sample_ring();
        let capture = AudioCapture::open_with_preference(producer, running, preferred_device)?;
        let resampler = RateConverter::new(capture.sample_rate, sample_rate, DRAIN_CHUNK)?;
        info!(
            capture_rate = capture.sample_rate,
            sample_rate, frame_length, "capture source ready"
        );

        Ok(Self {
            capture,
            consumer,
            resampler,
            drain: vec![0.0; DRAIN_CHUNK],
            converted: Vec::with_capacity(DRAIN_CHUNK * 2),
            pending: Vec::with_capacity(frame_length * 2),
            frame: AudioFrame::silent(frame_length, sample_rate),
        })
    }
}

impl AudioSource for CaptureSource {
    fn frame_length(&self) -> usize {
        self.frame.len()
    }

    fn sample_rate(&self) -> u32 {
        self.frame.sample_rate()
    }

    fn try_next_frame(&mut self) -> Option<&AudioFrame> {
        let frame_length = self.frame.len();
        while self.pending.len() < frame_length {
            let n = self.consumer.pop_slice(&mut self.drain);
            if n == 0 {
                return None;
            }
            self.converted.clear();
            self.resampler
                .process_into(&self.drain[..n], &mut self.converted);
            self.pending
                .extend(self.converted.iter().map(|s| f32_to_i16(*s)));
        }

        self.frame
            .samples_mut()
            .copy_from_slice(&self.pending[..frame_length]);
        self.pending.drain(..frame_length);
        Some(&self.frame)
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.capture.stop();
    }
}
