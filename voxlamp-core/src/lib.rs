//! # voxlamp-core
//!
//! Offline voice-command appliance core: wake word, then intent, then lights.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → AudioCapture → SPSC RingBuffer → CaptureSource ─┐
//!                                                WavSource ────┤ AudioSource
//!                                                              ▼
//!                                           Pipeline (spawn_blocking, one frame/cycle)
//!                                              │                         │
//!                                   AwaitingWakeWord              AwaitingIntent
//!                                   WakeWordEngine::process       IntentEngine::process
//!                                              │                         │ finalized
//!                                      signal_wake()             SlotLease → dispatch()
//!                                                                        │
//!                                                                 Actuator (LightBoard)
//! ```
//!
//! Engines are opaque behind [`recognition`] traits. Any non-success engine
//! status halts the assistant; nothing is retried.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod actuation;
pub mod audio;
pub mod buffering;
pub mod engine;
pub mod error;
pub mod events;
pub mod recognition;
pub mod vad;

// Convenience re-exports for downstream crates
pub use actuation::{ActuationCommand, Actuator, LightBoard};
pub use audio::{AudioSource, CaptureSource, WavSource};
pub use buffering::frame::AudioFrame;
pub use engine::{
    pipeline::{CycleOutcome, NullObserver, Pipeline, PipelineObserver, PipelinePhase},
    Assistant, AssistantConfig, AssistantHandle,
};
pub use error::{Result, VoxlampError};
pub use events::{AssistantStatus, AssistantStatusEvent, UtteranceEvent, WakeEvent};
pub use recognition::{
    energy::{EnergyBackend, EnergyBackendConfig},
    Inference, IntentEngine, RecognitionBackend, StatusCode, WakeWordEngine,
};
