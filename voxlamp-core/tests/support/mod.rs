//! Fake engines, sources and sinks shared by the integration tests.
//!
//! Every engine call is appended to one shared log so tests can check which
//! engine saw which frame, and in what order.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use voxlamp_core::actuation::{ActuationCommand, Actuator};
use voxlamp_core::audio::AudioSource;
use voxlamp_core::buffering::frame::AudioFrame;
use voxlamp_core::engine::pipeline::PipelineObserver;
use voxlamp_core::events::{UtteranceEvent, WakeEvent};
use voxlamp_core::recognition::{
    EngineDiagnostics, EngineResult, ErrorTrace, Inference, IntentEngine, IntentParams,
    IntentView, MemoryArena, RecognitionBackend, Slot, StatusCode, WakeWordEngine,
    WakeWordParams,
};

pub const FRAME_LENGTH: usize = 512;
pub const SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Wake(i16),
    Intent(i16),
    IsUnderstood,
    GetIntent,
    ReleaseSlots,
    Reset,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Frame tag: the first sample carries the frame's position in the script.
fn tag(frame: &AudioFrame) -> i16 {
    frame.samples()[0]
}

/// Yields tagged frames; `None` entries are polls with nothing ready.
pub struct ScriptedSource {
    script: VecDeque<Option<i16>>,
    frame: AudioFrame,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<i16>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            frame: AudioFrame::silent(FRAME_LENGTH, SAMPLE_RATE),
        }
    }

    /// `n` consecutive frames tagged `0..n`.
    pub fn frames(n: i16) -> Self {
        Self::new((0..n).map(Some))
    }
}

impl AudioSource for ScriptedSource {
    fn frame_length(&self) -> usize {
        FRAME_LENGTH
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn try_next_frame(&mut self) -> Option<&AudioFrame> {
        let tag = self.script.pop_front()??;
        self.frame.samples_mut()[0] = tag;
        Some(&self.frame)
    }

    fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

/// Fires keyword 0 on the listed frame tags.
pub struct FakeWakeWord {
    pub fire_on: Vec<i16>,
    pub fail_on: Option<(i16, StatusCode)>,
    pub log: CallLog,
}

impl WakeWordEngine for FakeWakeWord {
    fn frame_length(&self) -> usize {
        FRAME_LENGTH
    }

    fn process(&mut self, frame: &AudioFrame) -> EngineResult<Option<usize>> {
        let tag = tag(frame);
        self.log.lock().push(Call::Wake(tag));
        if let Some((at, status)) = self.fail_on {
            if at == tag {
                return Err(status);
            }
        }
        Ok(self.fire_on.contains(&tag).then_some(0))
    }
}

/// Finalizes after `frames_per_utterance` frames; answers from `results` in
/// order (`None` = not understood).
pub struct FakeIntent {
    pub frames_per_utterance: u32,
    pub results: VecDeque<Option<(String, Vec<Slot>)>>,
    pub fail_get_intent: bool,
    pub fail_release: Option<StatusCode>,
    pub fail_reset: Option<StatusCode>,
    pub fail_context_info: Option<StatusCode>,
    pub fail_on: Option<(i16, StatusCode)>,
    pub log: CallLog,
    seen: u32,
    current: Option<(String, Vec<Slot>)>,
}

impl FakeIntent {
    pub fn new(
        frames_per_utterance: u32,
        results: impl IntoIterator<Item = Option<(&'static str, Vec<Slot>)>>,
        log: CallLog,
    ) -> Self {
        Self {
            frames_per_utterance,
            results: results
                .into_iter()
                .map(|r| r.map(|(intent, slots)| (intent.to_string(), slots)))
                .collect(),
            fail_get_intent: false,
            fail_release: None,
            fail_reset: None,
            fail_context_info: None,
            fail_on: None,
            log,
            seen: 0,
            current: None,
        }
    }
}

impl IntentEngine for FakeIntent {
    fn frame_length(&self) -> usize {
        FRAME_LENGTH
    }

    fn process(&mut self, frame: &AudioFrame) -> EngineResult<bool> {
        let tag = tag(frame);
        self.log.lock().push(Call::Intent(tag));
        if let Some((at, status)) = self.fail_on {
            if at == tag {
                return Err(status);
            }
        }
        self.seen += 1;
        if self.seen < self.frames_per_utterance {
            return Ok(false);
        }
        self.current = self.results.pop_front().flatten();
        Ok(true)
    }

    fn is_understood(&self) -> EngineResult<bool> {
        self.log.lock().push(Call::IsUnderstood);
        Ok(self.current.is_some())
    }

    fn intent(&self) -> EngineResult<IntentView<'_>> {
        self.log.lock().push(Call::GetIntent);
        if self.fail_get_intent {
            return Err(StatusCode::InvalidState);
        }
        let (intent, slots) = self.current.as_ref().ok_or(StatusCode::InvalidState)?;
        Ok(IntentView {
            intent: intent.as_str(),
            slots: slots.as_slice(),
        })
    }

    fn release_slots(&mut self) -> EngineResult<()> {
        self.log.lock().push(Call::ReleaseSlots);
        self.fail_release.map_or(Ok(()), Err)
    }

    fn reset(&mut self) -> EngineResult<()> {
        self.log.lock().push(Call::Reset);
        if let Some(status) = self.fail_reset {
            return Err(status);
        }
        self.seen = 0;
        self.current = None;
        Ok(())
    }

    fn context_info(&self) -> EngineResult<String> {
        if let Some(status) = self.fail_context_info {
            return Err(status);
        }
        Ok("context:\n  name: fake".into())
    }
}

/// Hands out pre-built engines once.
pub struct FakeBackend {
    pub wake_word: Option<Box<dyn WakeWordEngine>>,
    pub intent: Option<Box<dyn IntentEngine>>,
}

impl EngineDiagnostics for FakeBackend {
    fn error_trace(&mut self) -> EngineResult<ErrorTrace> {
        Ok(ErrorTrace::new(vec!["fake backend exhausted".into()]))
    }

    fn release_error_trace(&mut self, _trace: ErrorTrace) {}
}

impl RecognitionBackend for FakeBackend {
    fn create_wake_word(
        &mut self,
        _params: &WakeWordParams,
        _arena: MemoryArena,
    ) -> EngineResult<Box<dyn WakeWordEngine>> {
        self.wake_word.take().ok_or(StatusCode::InvalidState)
    }

    fn create_intent(
        &mut self,
        _params: &IntentParams,
        _arena: MemoryArena,
    ) -> EngineResult<Box<dyn IntentEngine>> {
        self.intent.take().ok_or(StatusCode::InvalidState)
    }
}

/// Records applied commands and wake signals.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    pub commands: Arc<Mutex<Vec<ActuationCommand>>>,
    pub wakes: Arc<Mutex<u32>>,
}

impl Actuator for RecordingActuator {
    fn apply(&mut self, command: &ActuationCommand) -> bool {
        self.commands.lock().push(command.clone());
        true
    }

    fn signal_wake(&mut self) {
        *self.wakes.lock() += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub wakes: Arc<Mutex<Vec<WakeEvent>>>,
    pub utterances: Arc<Mutex<Vec<UtteranceEvent>>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_wake_detected(&mut self, event: &WakeEvent) {
        self.wakes.lock().push(event.clone());
    }

    fn on_utterance_result(&mut self, seq: u64, inference: &Inference<'_>) {
        self.utterances
            .lock()
            .push(UtteranceEvent::from_inference(seq, inference));
    }
}

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}
