use thiserror::Error;

use crate::recognition::StatusCode;

/// All errors produced by voxlamp-core.
///
/// Every engine-level variant is fatal: the orchestration loop never retries,
/// it bubbles the error to the entry point which halts.
#[derive(Debug, Error)]
pub enum VoxlampError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    /// Engine construction/configuration failed. `trace` holds the diagnostic
    /// lines pulled from the backend, in the order they were printed.
    #[error("{engine} init failed with '{status}'")]
    EngineInit {
        engine: &'static str,
        status: StatusCode,
        trace: Vec<String>,
    },

    #[error("unable to get {engine} error state with '{status}'")]
    ErrorTraceUnavailable {
        engine: &'static str,
        status: StatusCode,
    },

    /// A per-frame or per-utterance engine call failed mid-stream.
    #[error("{operation} failed with '{status}'")]
    EngineCall {
        operation: &'static str,
        status: StatusCode,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VoxlampError {
    /// The engine status behind this error, if it came from an engine boundary.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::EngineInit { status, .. }
            | Self::ErrorTraceUnavailable { status, .. }
            | Self::EngineCall { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VoxlampError>;
