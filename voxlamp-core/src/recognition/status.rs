//! Engine status codes.
//!
//! Recognition engines report failure with a `StatusCode`; success is simply
//! `Ok(_)`. The `Display` form is the canonical upper-snake description that
//! appears in halt diagnostics (`"wake-word process failed with 'INVALID_STATE'"`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Non-success status returned by an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    #[error("OUT_OF_MEMORY")]
    OutOfMemory,
    #[error("IO_ERROR")]
    IoError,
    #[error("INVALID_ARGUMENT")]
    InvalidArgument,
    #[error("STOP_ITERATION")]
    StopIteration,
    #[error("KEY_ERROR")]
    KeyError,
    #[error("INVALID_STATE")]
    InvalidState,
    #[error("RUNTIME_ERROR")]
    RuntimeError,
    #[error("ACTIVATION_ERROR")]
    ActivationError,
    #[error("ACTIVATION_LIMIT_REACHED")]
    ActivationLimitReached,
    #[error("ACTIVATION_THROTTLED")]
    ActivationThrottled,
    #[error("ACTIVATION_REFUSED")]
    ActivationRefused,
}

/// Result type returned across the engine boundary.
pub type EngineResult<T> = std::result::Result<T, StatusCode>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_upper_snake() {
        assert_eq!(StatusCode::OutOfMemory.to_string(), "OUT_OF_MEMORY");
        assert_eq!(
            StatusCode::ActivationLimitReached.to_string(),
            "ACTIVATION_LIMIT_REACHED"
        );
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_value(StatusCode::KeyError).expect("serialize status");
        assert_eq!(json, "KEY_ERROR");
    }
}
