//! Audio sources and cpal capture.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority. It
//! **must not** block or perform I/O, and only allocates its downmix buffer
//! once up front. Samples are downmixed to mono f32 and pushed into an SPSC
//! ring; everything else (resampling, i16 conversion, frame assembly) happens
//! on the pipeline thread inside [`CaptureSource`].
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms, so a `CaptureSource` must be
//! opened and dropped on the thread that runs the loop.

pub mod capture;
pub mod device;
pub mod resample;
pub mod wav;

pub use capture::CaptureSource;
pub use wav::WavSource;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SizedSample, Stream, StreamConfig,
};

use crate::buffering::{frame::AudioFrame, SampleProducer};
use crate::error::{Result, VoxlampError};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Non-blocking supplier of fixed-length frames.
pub trait AudioSource {
    /// Samples per frame this source produces.
    fn frame_length(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// The next full frame, or `None` if one is not ready yet. Never blocks.
    /// The frame is lent until the next call.
    fn try_next_frame(&mut self) -> Option<&AudioFrame>;

    /// `true` once a finite source has nothing more to give.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Handle to an active cpal input stream feeding a sample ring.
///
/// **Not `Send`** — create and drop on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag — set to `false` to make the callback a no-op.
    running: Arc<AtomicBool>,
    /// Actual capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
}

impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available one.
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        producer: SampleProducer,
        running: Arc<AtomicBool>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let preferred = preferred_device_name.and_then(|wanted| {
            let found = host
                .input_devices()
                .ok()?
                .find(|device| device.name().map(|name| name == wanted).unwrap_or(false));
            if found.is_none() {
                warn!("preferred input device '{wanted}' not found, falling back");
            }
            found
        });

        let device = match preferred.or_else(|| host.default_input_device()) {
            Some(device) => device,
            None => {
                let mut devices = host
                    .input_devices()
                    .map_err(|e| VoxlampError::AudioDevice(e.to_string()))?;
                warn!("no default input device, falling back to first available input");
                devices.next().ok_or(VoxlampError::NoDefaultInputDevice)?
            }
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| VoxlampError::AudioDevice(e.to_string()))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        info!(sample_rate, channels, "audio config selected");

        let config: StreamConfig = supported.config();
        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                build_mono_stream::<f32>(&device, &config, producer, &running, |s| s)
            }
            SampleFormat::I16 => {
                build_mono_stream::<i16>(&device, &config, producer, &running, |s| {
                    s as f32 / 32768.0
                })
            }
            SampleFormat::U8 => {
                build_mono_stream::<u8>(&device, &config, producer, &running, |s| {
                    (s as f32 - 128.0) / 128.0
                })
            }
            fmt => {
                return Err(VoxlampError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| VoxlampError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
        })
    }

    /// Signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Build an input stream that downmixes interleaved `T` samples to mono f32.
#[cfg(feature = "audio-cpal")]
fn build_mono_stream<T: SizedSample + Copy + Send + 'static>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: SampleProducer,
    running: &Arc<AtomicBool>,
    to_f32: fn(T) -> f32,
) -> Result<Stream> {
    use crate::buffering::Producer;

    let channels = (config.channels as usize).max(1);
    let running = Arc::clone(running);
    // Sized for a generous device period so the callback never reallocates.
    let mut mono: Vec<f32> = Vec::with_capacity(8192);

    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    return;
                }
                mono.clear();
                mono.extend(data.chunks_exact(channels).map(|frame| {
                    frame.iter().map(|s| to_f32(*s)).sum::<f32>() / channels as f32
                }));
                let written = producer.push_slice(&mono);
                if written < mono.len() {
                    warn!("sample ring full: dropped {} samples", mono.len() - written);
                }
            },
            |err| error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| VoxlampError::AudioStream(e.to_string()))
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open_with_preference(
        _producer: SampleProducer,
        _running: Arc<AtomicBool>,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(VoxlampError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
