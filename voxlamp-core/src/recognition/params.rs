//! Construction parameters for the two engines.
//!
//! Range checks live here so every backend rejects the same inputs with the
//! same status.

use super::StatusCode;

/// Allowed endpoint duration range, in seconds.
pub const ENDPOINT_DURATION_RANGE: (f32, f32) = (0.5, 5.0);

/// One keyword model blob and its detection sensitivity.
#[derive(Debug, Clone)]
pub struct KeywordModel {
    pub bytes: Vec<u8>,
    /// In [0.0, 1.0]. Higher detects more readily, with more false alarms.
    pub sensitivity: f32,
}

impl KeywordModel {
    pub fn new(bytes: Vec<u8>, sensitivity: f32) -> Self {
        Self { bytes, sensitivity }
    }
}

#[derive(Debug, Clone)]
pub struct WakeWordParams {
    pub access_key: String,
    pub keywords: Vec<KeywordModel>,
}

impl WakeWordParams {
    pub fn validate(&self) -> Result<(), StatusCode> {
        if self.keywords.is_empty() {
            return Err(StatusCode::InvalidArgument);
        }
        for keyword in &self.keywords {
            if keyword.bytes.is_empty() || !in_unit_range(keyword.sensitivity) {
                return Err(StatusCode::InvalidArgument);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IntentParams {
    pub access_key: String,
    /// Compiled grammar/context blob.
    pub context: Vec<u8>,
    pub sensitivity: f32,
    /// Trailing silence (seconds) that ends an utterance.
    pub endpoint_duration_secs: f32,
    /// When `false` the engine may finalize without trailing silence.
    pub require_endpoint: bool,
}

impl IntentParams {
    pub fn validate(&self) -> Result<(), StatusCode> {
        let (lo, hi) = ENDPOINT_DURATION_RANGE;
        if self.context.is_empty()
            || !in_unit_range(self.sensitivity)
            || !(lo..=hi).contains(&self.endpoint_duration_secs)
        {
            return Err(StatusCode::InvalidArgument);
        }
        Ok(())
    }
}

fn in_unit_range(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}
