//! `EnergyBackend` — model-free reference engines driven by an energy VAD.
//!
//! Lets the full appliance loop run on a host without vendor models:
//!
//! - [`EnergyWakeWord`] fires a keyword after a run of voiced frames. Higher
//!   sensitivity shortens the run.
//! - [`EndpointIntent`] finalizes an utterance after speech followed by the
//!   configured endpoint silence (or at the max utterance length when an
//!   endpoint is not required). Results are taken from the context blob's
//!   scripted responses, one per utterance, cycling.
//!
//! Construction performs the same checks a real engine would (credential,
//! parameter ranges, blob validity, arena size) and records an error trace.
//! The arena is only size-checked here: each engine holds it for its lifetime
//! so it is freed with the engine, but working state lives in plain fields.

use tracing::{debug, info};

use super::context::{ContextScript, ScriptedIntent};
use super::{
    EngineDiagnostics, EngineResult, ErrorTrace, IntentEngine, IntentParams, IntentView,
    MemoryArena, RecognitionBackend, StatusCode, WakeWordEngine, WakeWordParams,
};
use crate::buffering::frame::{AudioFrame, DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE};
use crate::vad::{energy::EnergyVad, VadDecision, VoiceActivityDetector};

/// Arena bytes the wake-word engine needs.
pub const WAKE_WORD_ARENA_BYTES: usize = 8 * 1024;
/// Arena bytes the intent engine needs.
pub const INTENT_ARENA_BYTES: usize = 32 * 1024;

const MIN_UTTERANCE_FRAMES: u32 = 3;

#[derive(Debug, Clone)]
pub struct EnergyBackendConfig {
    pub frame_length: usize,
    pub sample_rate: u32,
    /// Normalised RMS threshold for the shared VAD.
    pub vad_threshold: f32,
    pub vad_hangover_frames: u32,
    /// Intent engine gives up (not understood) if no speech starts in time.
    pub listen_timeout_secs: f32,
    /// Utterance length at which an endpoint-optional engine finalizes.
    pub max_utterance_secs: f32,
}

impl Default for EnergyBackendConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            vad_threshold: 0.02,
            vad_hangover_frames: 2,
            listen_timeout_secs: 4.0,
            max_utterance_secs: 3.0,
        }
    }
}

impl EnergyBackendConfig {
    fn frames_for(&self, secs: f32) -> u32 {
        let per_frame = self.frame_length as f32 / self.sample_rate as f32;
        (secs / per_frame).ceil().max(1.0) as u32
    }
}

/// Backend building [`EnergyWakeWord`] and [`EndpointIntent`] engines.
#[derive(Debug, Default)]
pub struct EnergyBackend {
    config: EnergyBackendConfig,
    trace: Vec<String>,
    outstanding_traces: usize,
}

impl EnergyBackend {
    pub fn new(config: EnergyBackendConfig) -> Self {
        Self {
            config,
            trace: Vec::new(),
            outstanding_traces: 0,
        }
    }

    /// Traces handed out by `error_trace` and not yet released.
    pub fn outstanding_traces(&self) -> usize {
        self.outstanding_traces
    }

    fn fail(&mut self, status: StatusCode, line: String) -> StatusCode {
        self.trace.push(line);
        status
    }

    fn check_access_key(&mut self, engine: &str, key: &str) -> EngineResult<()> {
        if key.trim().is_empty() {
            return Err(self.fail(
                StatusCode::ActivationError,
                format!("{engine}: access key is empty"),
            ));
        }
        Ok(())
    }

    fn check_arena(&mut self, engine: &str, arena: &MemoryArena, needed: usize) -> EngineResult<()> {
        if arena.len() < needed {
            return Err(self.fail(
                StatusCode::OutOfMemory,
                format!(
                    "{engine}: arena of {} bytes is smaller than the {needed} bytes required",
                    arena.len()
                ),
            ));
        }
        Ok(())
    }

    fn vad(&self) -> EnergyVad {
        EnergyVad::new(self.config.vad_threshold, self.config.vad_hangover_frames)
    }
}

impl EngineDiagnostics for EnergyBackend {
    fn error_trace(&mut self) -> EngineResult<ErrorTrace> {
        self.outstanding_traces += 1;
        Ok(ErrorTrace::new(std::mem::take(&mut self.trace)))
    }

    fn release_error_trace(&mut self, trace: ErrorTrace) {
        debug!(depth = trace.depth(), "error trace released");
        self.outstanding_traces = self.outstanding_traces.saturating_sub(1);
    }
}

impl RecognitionBackend for EnergyBackend {
    fn create_wake_word(
        &mut self,
        params: &WakeWordParams,
        arena: MemoryArena,
    ) -> EngineResult<Box<dyn WakeWordEngine>> {
        self.trace.clear();
        self.check_access_key("wake-word", &params.access_key)?;

        if params.validate().is_err() {
            if params.keywords.is_empty() {
                self.trace.push("wake-word: no keyword models provided".into());
            }
            for (idx, keyword) in params.keywords.iter().enumerate() {
                if keyword.bytes.is_empty() {
                    self.trace.push(format!("wake-word: keyword {idx} model is empty"));
                }
                if !(0.0..=1.0).contains(&keyword.sensitivity) {
                    self.trace.push(format!(
                        "wake-word: keyword {idx} sensitivity {} is outside [0, 1]",
                        keyword.sensitivity
                    ));
                }
            }
            return Err(StatusCode::InvalidArgument);
        }

        self.check_arena("wake-word", &arena, WAKE_WORD_ARENA_BYTES)?;

        let required_runs = params
            .keywords
            .iter()
            .map(|k| required_voiced_frames(k.sensitivity))
            .collect::<Vec<_>>();
        info!(keywords = required_runs.len(), ?required_runs, "energy wake-word engine ready");

        Ok(Box::new(EnergyWakeWord {
            frame_length: self.config.frame_length,
            vad: self.vad(),
            required_runs,
            voiced_run: 0,
            _arena: arena,
        }))
    }

    fn create_intent(
        &mut self,
        params: &IntentParams,
        arena: MemoryArena,
    ) -> EngineResult<Box<dyn IntentEngine>> {
        self.trace.clear();
        self.check_access_key("intent", &params.access_key)?;

        if params.validate().is_err() {
            self.trace.push(format!(
                "intent: invalid parameters (context {} bytes, sensitivity {}, endpoint {} s)",
                params.context.len(),
                params.sensitivity,
                params.endpoint_duration_secs
            ));
            return Err(StatusCode::InvalidArgument);
        }

        let script = match ContextScript::parse(&params.context) {
            Ok(script) => script,
            Err(problems) => {
                self.trace
                    .extend(problems.into_iter().map(|p| format!("intent: {p}")));
                return Err(StatusCode::InvalidArgument);
            }
        };

        self.check_arena("intent", &arena, INTENT_ARENA_BYTES)?;

        let endpoint_frames = self.config.frames_for(params.endpoint_duration_secs);
        info!(
            context = %script.name,
            endpoint_frames,
            require_endpoint = params.require_endpoint,
            "energy intent engine ready"
        );

        Ok(Box::new(EndpointIntent {
            frame_length: self.config.frame_length,
            vad: self.vad(),
            script,
            next_response: 0,
            endpoint_frames,
            require_endpoint: params.require_endpoint,
            timeout_frames: self.config.frames_for(self.config.listen_timeout_secs),
            max_utterance_frames: self.config.frames_for(self.config.max_utterance_secs),
            state: Listening::default(),
            result: None,
            _arena: arena,
        }))
    }
}

/// Voiced frames needed to fire at a given sensitivity: 12 at 0.0, 2 at 1.0.
fn required_voiced_frames(sensitivity: f32) -> u32 {
    ((1.0 - sensitivity.clamp(0.0, 1.0)) * 10.0).round() as u32 + 2
}

pub struct EnergyWakeWord {
    frame_length: usize,
    vad: EnergyVad,
    required_runs: Vec<u32>,
    voiced_run: u32,
    _arena: MemoryArena,
}

impl WakeWordEngine for EnergyWakeWord {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &AudioFrame) -> EngineResult<Option<usize>> {
        if frame.len() != self.frame_length {
            return Err(StatusCode::InvalidArgument);
        }

        match self.vad.classify(frame) {
            VadDecision::Speech => self.voiced_run = self.voiced_run.saturating_add(1),
            VadDecision::Silence => self.voiced_run = 0,
        }

        let fired = self
            .required_runs
            .iter()
            .position(|required| self.voiced_run >= *required);
        if fired.is_some() {
            self.voiced_run = 0;
            self.vad.reset();
        }
        Ok(fired)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Listening {
    waited: u32,
    speech_frames: u32,
    trailing_silence: u32,
}

enum Finalized {
    NotUnderstood,
    Understood {
        intent: ScriptedIntent,
        released: bool,
    },
}

pub struct EndpointIntent {
    frame_length: usize,
    vad: EnergyVad,
    script: ContextScript,
    next_response: usize,
    endpoint_frames: u32,
    require_endpoint: bool,
    timeout_frames: u32,
    max_utterance_frames: u32,
    state: Listening,
    result: Option<Finalized>,
    _arena: MemoryArena,
}

impl EndpointIntent {
    fn finalize(&mut self) {
        let heard_enough = self.state.speech_frames >= MIN_UTTERANCE_FRAMES;
        let response = if heard_enough && !self.script.responses.is_empty() {
            let idx = self.next_response % self.script.responses.len();
            self.next_response = self.next_response.wrapping_add(1);
            self.script.responses[idx].clone()
        } else {
            None
        };

        debug!(
            speech_frames = self.state.speech_frames,
            understood = response.is_some(),
            "utterance finalized"
        );

        self.result = Some(match response {
            Some(intent) => Finalized::Understood {
                intent,
                released: false,
            },
            None => Finalized::NotUnderstood,
        });
    }
}

impl IntentEngine for EndpointIntent {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &AudioFrame) -> EngineResult<bool> {
        if self.result.is_some() {
            return Err(StatusCode::InvalidState);
        }
        if frame.len() != self.frame_length {
            return Err(StatusCode::InvalidArgument);
        }

        let decision = self.vad.classify(frame);
        let state = &mut self.state;
        if state.speech_frames == 0 {
            if decision.is_speech() {
                state.speech_frames = 1;
            } else {
                state.waited += 1;
            }
        } else if decision.is_speech() {
            state.speech_frames += 1;
            state.trailing_silence = 0;
        } else {
            state.trailing_silence += 1;
        }

        let done = if state.speech_frames == 0 {
            state.waited >= self.timeout_frames
        } else {
            state.trailing_silence >= self.endpoint_frames
                || (!self.require_endpoint && state.speech_frames >= self.max_utterance_frames)
        };

        if done {
            self.finalize();
        }
        Ok(done)
    }

    fn is_understood(&self) -> EngineResult<bool> {
        match &self.result {
            Some(Finalized::Understood { .. }) => Ok(true),
            Some(Finalized::NotUnderstood) => Ok(false),
            None => Err(StatusCode::InvalidState),
        }
    }

    fn intent(&self) -> EngineResult<IntentView<'_>> {
        match &self.result {
            Some(Finalized::Understood {
                intent,
                released: false,
            }) => Ok(IntentView {
                intent: &intent.intent,
                slots: &intent.slots,
            }),
            _ => Err(StatusCode::InvalidState),
        }
    }

    fn release_slots(&mut self) -> EngineResult<()> {
        match &mut self.result {
            Some(Finalized::Understood { released, .. }) if !*released => {
                *released = true;
                Ok(())
            }
            _ => Err(StatusCode::InvalidState),
        }
    }

    fn reset(&mut self) -> EngineResult<()> {
        if matches!(
            self.result,
            Some(Finalized::Understood {
                released: false,
                ..
            })
        ) {
            return Err(StatusCode::InvalidState);
        }
        self.result = None;
        self.state = Listening::default();
        self.vad.reset();
        Ok(())
    }

    fn context_info(&self) -> EngineResult<String> {
        Ok(self.script.info())
    }
}
