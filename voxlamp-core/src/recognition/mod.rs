//! Recognition engine contracts.
//!
//! The orchestration loop only ever talks to engines through these traits, so
//! the acoustic models behind them stay opaque. Two engines share one audio
//! stream:
//!
//! - [`WakeWordEngine`] spots a keyword, one frame per call.
//! - [`IntentEngine`] accumulates frames until it finalizes an utterance, then
//!   exposes an [`Inference`]. Its slot storage is engine-owned and lent out
//!   through a [`SlotLease`], which releases it on every exit path.
//!
//! Engines are built by a [`RecognitionBackend`], which also owns the
//! diagnostic error trace for construction failures.

pub mod arena;
pub mod context;
pub mod energy;
pub mod params;
pub mod status;

pub use arena::{MemoryArena, DEFAULT_ARENA_BYTES};
pub use params::{IntentParams, KeywordModel, WakeWordParams};
pub use status::{EngineResult, StatusCode};

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buffering::frame::AudioFrame;

/// Keyword spotter: consumes one frame per call.
pub trait WakeWordEngine: Send + 'static {
    /// Samples per frame this engine expects.
    fn frame_length(&self) -> usize;

    /// Process one frame. `Some(index)` names the keyword that fired.
    fn process(&mut self, frame: &AudioFrame) -> EngineResult<Option<usize>>;
}

/// Grammar-constrained intent recogniser: consumes one frame per call until
/// it finalizes an utterance.
pub trait IntentEngine: Send + 'static {
    fn frame_length(&self) -> usize;

    /// Process one frame. Returns `true` once the utterance is finalized.
    fn process(&mut self, frame: &AudioFrame) -> EngineResult<bool>;

    /// Valid only after `process` returned `true`.
    fn is_understood(&self) -> EngineResult<bool>;

    /// Valid only when `is_understood` returned `true`. Borrowed from the
    /// engine's result buffer, which is held until `release_slots`.
    fn intent(&self) -> EngineResult<IntentView<'_>>;

    /// Give the slot/value buffer back to the engine.
    fn release_slots(&mut self) -> EngineResult<()>;

    /// Clear all utterance state. Called exactly once per finalized utterance
    /// before the next `process`.
    fn reset(&mut self) -> EngineResult<()>;

    /// Human-readable description of the loaded context (grammar).
    fn context_info(&self) -> EngineResult<String>;
}

/// One (slot, value) pair of an understood intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub value: String,
}

impl Slot {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An understood intent borrowed from an engine.
#[derive(Debug, Clone, Copy)]
pub struct IntentView<'a> {
    pub intent: &'a str,
    pub slots: &'a [Slot],
}

/// Outcome of one finalized utterance.
#[derive(Debug, Clone, Copy)]
pub enum Inference<'a> {
    NotUnderstood,
    Understood(IntentView<'a>),
}

impl Inference<'_> {
    pub fn is_understood(&self) -> bool {
        matches!(self, Inference::Understood(_))
    }

    pub fn slot_count(&self) -> usize {
        match self {
            Inference::NotUnderstood => 0,
            Inference::Understood(view) => view.slots.len(),
        }
    }
}

/// Scoped borrow of an intent engine's slot buffer.
///
/// The lease arms once `view()` hands out slots. `release()` gives the buffer
/// back and surfaces any engine error; an armed lease dropped without it (an
/// early `?` return) is released by `Drop`. A lease whose `view()` failed was
/// never handed anything and releases nothing.
pub struct SlotLease<'e> {
    engine: &'e mut dyn IntentEngine,
    armed: Cell<bool>,
}

impl<'e> SlotLease<'e> {
    pub fn new(engine: &'e mut dyn IntentEngine) -> Self {
        Self {
            engine,
            armed: Cell::new(false),
        }
    }

    pub fn view(&self) -> EngineResult<IntentView<'_>> {
        let view = self.engine.intent()?;
        self.armed.set(true);
        Ok(view)
    }

    pub fn release(mut self) -> EngineResult<()> {
        self.armed.set(false);
        self.engine.release_slots()
    }
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        if self.armed.get() {
            if let Err(status) = self.engine.release_slots() {
                warn!(%status, "slot release on unwind failed");
            }
        }
    }
}

/// Ordered diagnostic lines describing why an engine could not be built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTrace {
    lines: Vec<String>,
}

impl ErrorTrace {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn depth(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Diagnostics exposed by an engine vendor.
pub trait EngineDiagnostics {
    /// Human-readable description of a status code.
    fn describe_status(&self, status: StatusCode) -> String {
        status.to_string()
    }

    /// Diagnostic trace of the most recent construction failure.
    fn error_trace(&mut self) -> EngineResult<ErrorTrace>;

    /// Return a trace obtained from `error_trace`.
    fn release_error_trace(&mut self, trace: ErrorTrace);
}

/// Factory for both engines. Each constructor takes its arena by value.
pub trait RecognitionBackend: EngineDiagnostics {
    fn create_wake_word(
        &mut self,
        params: &WakeWordParams,
        arena: MemoryArena,
    ) -> EngineResult<Box<dyn WakeWordEngine>>;

    fn create_intent(
        &mut self,
        params: &IntentParams,
        arena: MemoryArena,
    ) -> EngineResult<Box<dyn IntentEngine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingEngine {
        slots: Vec<Slot>,
        releases: usize,
        fail_intent: bool,
    }

    impl IntentEngine for CountingEngine {
        fn frame_length(&self) -> usize {
            512
        }

        fn process(&mut self, _frame: &AudioFrame) -> EngineResult<bool> {
            Ok(true)
        }

        fn is_understood(&self) -> EngineResult<bool> {
            Ok(true)
        }

        fn intent(&self) -> EngineResult<IntentView<'_>> {
            if self.fail_intent {
                return Err(StatusCode::InvalidState);
            }
            Ok(IntentView {
                intent: "changeColor",
                slots: &self.slots,
            })
        }

        fn release_slots(&mut self) -> EngineResult<()> {
            self.releases += 1;
            Ok(())
        }

        fn reset(&mut self) -> EngineResult<()> {
            Ok(())
        }

        fn context_info(&self) -> EngineResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn explicit_release_releases_once() {
        let mut engine = CountingEngine {
            slots: vec![Slot::new("color", "red")],
            ..Default::default()
        };
        {
            let lease = SlotLease::new(&mut engine);
            assert_eq!(lease.view().expect("view").slots.len(), 1);
            lease.release().expect("release");
        }
        assert_eq!(engine.releases, 1);
    }

    #[test]
    fn early_return_after_view_still_releases() {
        fn consume(engine: &mut CountingEngine) -> EngineResult<()> {
            let lease = SlotLease::new(engine);
            let view = lease.view()?;
            if view.slots.is_empty() {
                return Err(StatusCode::KeyError);
            }
            lease.release()
        }

        let mut engine = CountingEngine::default();
        assert_eq!(consume(&mut engine), Err(StatusCode::KeyError));
        assert_eq!(engine.releases, 1);
    }

    #[test]
    fn failed_view_releases_nothing() {
        let mut engine = CountingEngine {
            fail_intent: true,
            ..Default::default()
        };
        {
            let lease = SlotLease::new(&mut engine);
            assert_eq!(lease.view().err(), Some(StatusCode::InvalidState));
        }
        assert_eq!(engine.releases, 0);
    }

    #[test]
    fn inference_counts_slots() {
        let slots = [Slot::new("state", "on"), Slot::new("state", "off")];
        let understood = Inference::Understood(IntentView {
            intent: "changeLightState",
            slots: &slots,
        });
        assert!(understood.is_understood());
        assert_eq!(understood.slot_count(), 2);
        assert_eq!(Inference::NotUnderstood.slot_count(), 0);
    }
}
