//! Lock-free SPSC ring buffer between the capture callback and the pipeline thread.
//!
//! Uses `ringbuf::HeapRb<f32>` which provides a wait-free `push_slice`
//! safe to call from the real-time audio callback. Samples stay f32 (device
//! rate, mono) until the pipeline side resamples and assembles i16 frames.

pub mod frame;

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Observer, Producer};

/// Producer half — held by the audio callback thread.
pub type SampleProducer = ringbuf::HeapProd<f32>;

/// Consumer half — held by the pipeline thread.
pub type SampleConsumer = ringbuf::HeapCons<f32>;

/// Ring capacity: 2^16 = 65 536 samples ≈ 1.4 s at 48 kHz.
///
/// The loop drains one frame per cycle and never blocks, so the ring only
/// has to absorb scheduling jitter and the wake-feedback chase.
pub const RING_CAPACITY: usize = 1 << 16;

/// Create a matched producer/consumer pair backed by a heap-allocated ring buffer.
pub fn create_sample_ring() -> (SampleProducer, SampleConsumer) {
    create_sample_ring_with_capacity(RING_CAPACITY)
}

pub fn create_sample_ring_with_capacity(capacity: usize) -> (SampleProducer, SampleConsumer) {
    HeapRb::<f32>::new(capacity).split()
}
