//! Two-phase orchestration loop.
//!
//! ## Per cycle
//!
//! ```text
//! 1. Poll the source (non-blocking). No frame → cycle ends, nothing else runs.
//! 2. Route the frame to exactly one engine by phase:
//!      AwaitingWakeWord → wake-word engine
//!          detection → wake feedback, on_wake_detected, phase = AwaitingIntent
//!      AwaitingIntent   → intent engine
//!          finalized → is_understood
//!                      understood: lease slots → on_utterance_result → dispatch → release
//!                      otherwise:  on_utterance_result (no actuation)
//!                    → reset engine → phase = AwaitingWakeWord
//! ```
//!
//! Any non-success engine status is reported and returned; `run` never
//! retries and never swallows it. The loop owns the phase exclusively and is
//! the only code that touches either engine.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use tracing::{debug, info, info_span, Span};

use crate::{
    actuation::Actuator,
    audio::AudioSource,
    engine::{dispatch, report::OrHalt, AssistantConfig},
    error::{Result, VoxlampError},
    events::WakeEvent,
    recognition::{Inference, IntentEngine, SlotLease, WakeWordEngine},
};

const WAKE_PROCESS: &str = "wake-word process";
const INTENT_PROCESS: &str = "intent process";
const INTENT_IS_UNDERSTOOD: &str = "intent is_understood";
const INTENT_GET_INTENT: &str = "intent get_intent";
const INTENT_RELEASE_SLOTS: &str = "intent release_slots";
const INTENT_RESET: &str = "intent reset";

/// Which engine receives the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePhase {
    #[default]
    AwaitingWakeWord,
    AwaitingIntent,
}

/// What one call to [`Pipeline::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source had no frame ready.
    NoFrame,
    /// Frame went to the wake-word engine; nothing fired.
    Listening,
    /// Frame went to the wake-word engine and keyword `keyword_index` fired.
    WakeDetected { keyword_index: usize },
    /// Frame went to the intent engine; utterance still open.
    Collecting,
    /// Frame went to the intent engine, which finalized; engine already reset.
    Finalized { understood: bool },
}

/// Side-effect callbacks exposed to the host application.
///
/// Both receive borrowed data; anything kept must be copied out
/// (see [`crate::events::UtteranceEvent::from_inference`]).
pub trait PipelineObserver: Send + 'static {
    fn on_wake_detected(&mut self, _event: &WakeEvent) {}

    /// `seq` matches the wake event that opened the utterance.
    fn on_utterance_result(&mut self, _seq: u64, _inference: &Inference<'_>) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

#[derive(Default)]
pub struct PipelineDiagnostics {
    pub frames_in: AtomicU64,
    pub idle_polls: AtomicU64,
    pub wake_detections: AtomicU64,
    pub utterances: AtomicU64,
    pub understood: AtomicU64,
    pub not_understood: AtomicU64,
    pub commands_applied: AtomicU64,
}

impl PipelineDiagnostics {
    pub fn reset(&self) {
        for counter in [
            &self.frames_in,
            &self.idle_polls,
            &self.wake_detections,
            &self.utterances,
            &self.understood,
            &self.not_understood,
            &self.commands_applied,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            idle_polls: self.idle_polls.load(Ordering::Relaxed),
            wake_detections: self.wake_detections.load(Ordering::Relaxed),
            utterances: self.utterances.load(Ordering::Relaxed),
            understood: self.understood.load(Ordering::Relaxed),
            not_understood: self.not_understood.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub frames_in: u64,
    pub idle_polls: u64,
    pub wake_detections: u64,
    pub utterances: u64,
    pub understood: u64,
    pub not_understood: u64,
    pub commands_applied: u64,
}

/// Everything the loop needs, passed as one struct.
pub struct PipelineContext {
    pub config: AssistantConfig,
    pub wake_word: Box<dyn WakeWordEngine>,
    pub intent: Box<dyn IntentEngine>,
    pub source: Box<dyn AudioSource>,
    pub actuator: Box<dyn Actuator>,
    pub observer: Box<dyn PipelineObserver>,
    pub running: Arc<AtomicBool>,
    pub diagnostics: Arc<PipelineDiagnostics>,
}

pub struct Pipeline {
    config: AssistantConfig,
    wake_word: Box<dyn WakeWordEngine>,
    intent: Box<dyn IntentEngine>,
    source: Box<dyn AudioSource>,
    actuator: Box<dyn Actuator>,
    observer: Box<dyn PipelineObserver>,
    running: Arc<AtomicBool>,
    diagnostics: Arc<PipelineDiagnostics>,
    phase: PipelinePhase,
    wake_seq: u64,
    utterance_span: Option<Span>,
}

impl Pipeline {
    /// # Errors
    /// `VoxlampError::InvalidConfig` when the source and engines disagree on
    /// frame length or sample rate.
    pub fn new(ctx: PipelineContext) -> Result<Self> {
        let frame_length = ctx.source.frame_length();
        if frame_length != ctx.wake_word.frame_length()
            || frame_length != ctx.intent.frame_length()
        {
            return Err(VoxlampError::InvalidConfig(format!(
                "frame length mismatch: source {frame_length}, wake-word {}, intent {}",
                ctx.wake_word.frame_length(),
                ctx.intent.frame_length()
            )));
        }
        if ctx.source.sample_rate() != ctx.config.sample_rate {
            return Err(VoxlampError::InvalidConfig(format!(
                "source delivers {} Hz, engines expect {} Hz",
                ctx.source.sample_rate(),
                ctx.config.sample_rate
            )));
        }

        Ok(Self {
            config: ctx.config,
            wake_word: ctx.wake_word,
            intent: ctx.intent,
            source: ctx.source,
            actuator: ctx.actuator,
            observer: ctx.observer,
            running: ctx.running,
            diagnostics: ctx.diagnostics,
            phase: PipelinePhase::AwaitingWakeWord,
            wake_seq: 0,
            utterance_span: None,
        })
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Run exactly one cycle.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        let Some(frame) = self.source.try_next_frame() else {
            PipelineDiagnostics::bump(&self.diagnostics.idle_polls, 1);
            return Ok(CycleOutcome::NoFrame);
        };
        PipelineDiagnostics::bump(&self.diagnostics.frames_in, 1);

        match self.phase {
            PipelinePhase::AwaitingWakeWord => {
                match self.wake_word.process(frame).or_halt(WAKE_PROCESS)? {
                    Some(keyword_index) => Ok(self.wake_detected(keyword_index)),
                    None => Ok(CycleOutcome::Listening),
                }
            }
            PipelinePhase::AwaitingIntent => {
                if !self.intent.process(frame).or_halt(INTENT_PROCESS)? {
                    return Ok(CycleOutcome::Collecting);
                }
                let understood = self.finish_utterance()?;
                Ok(CycleOutcome::Finalized { understood })
            }
        }
    }

    /// Loop until stopped, the source runs dry, or an engine fails.
    pub fn run(mut self) -> Result<()> {
        info!(phase = ?self.phase, "pipeline started");

        loop {
            if !self.running.load(Ordering::Relaxed) {
                info!("stop requested");
                break;
            }

            if self.step()? == CycleOutcome::NoFrame {
                if self.source.is_exhausted() {
                    info!("audio source exhausted");
                    break;
                }
                if !self.config.idle_poll.is_zero() {
                    std::thread::sleep(self.config.idle_poll);
                }
            }
        }

        let summary = self.diagnostics.snapshot();
        info!(
            frames = summary.frames_in,
            wakes = summary.wake_detections,
            utterances = summary.utterances,
            "pipeline stopped"
        );
        Ok(())
    }

    fn wake_detected(&mut self, keyword_index: usize) -> CycleOutcome {
        self.wake_seq += 1;
        PipelineDiagnostics::bump(&self.diagnostics.wake_detections, 1);
        info!(keyword_index, seq = self.wake_seq, "[wake word]");

        self.observer.on_wake_detected(&WakeEvent {
            seq: self.wake_seq,
            keyword_index,
        });
        self.actuator.signal_wake();

        self.utterance_span = Some(info_span!("utterance", utterance_id = self.wake_seq));
        self.phase = PipelinePhase::AwaitingIntent;
        CycleOutcome::WakeDetected { keyword_index }
    }

    /// Consume a finalized result, then reset the engine and re-arm the wake word.
    fn finish_utterance(&mut self) -> Result<bool> {
        let span = self.utterance_span.take().unwrap_or_else(Span::none);
        let _enter = span.enter();
        let seq = self.wake_seq;

        let understood = self.intent.is_understood().or_halt(INTENT_IS_UNDERSTOOD)?;
        if understood {
            let lease = SlotLease::new(self.intent.as_mut());
            let view = lease.view().or_halt(INTENT_GET_INTENT)?;
            debug!(intent = view.intent, slots = view.slots.len(), "utterance understood");

            self.observer
                .on_utterance_result(seq, &Inference::Understood(view));
            let applied = dispatch::dispatch(view.intent, view.slots, self.actuator.as_mut());
            PipelineDiagnostics::bump(&self.diagnostics.commands_applied, applied as u64);

            lease.release().or_halt(INTENT_RELEASE_SLOTS)?;
            PipelineDiagnostics::bump(&self.diagnostics.understood, 1);
        } else {
            info!("utterance not understood");
            self.observer
                .on_utterance_result(seq, &Inference::NotUnderstood);
            PipelineDiagnostics::bump(&self.diagnostics.not_understood, 1);
        }

        self.intent.reset().or_halt(INTENT_RESET)?;
        PipelineDiagnostics::bump(&self.diagnostics.utterances, 1);
        self.phase = PipelinePhase::AwaitingWakeWord;
        Ok(understood)
    }
}
