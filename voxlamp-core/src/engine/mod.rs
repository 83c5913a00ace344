//! `Assistant`: top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! Assistant::bootstrap()   → arenas bound, both engines built, status = Idle
//!     └─► run(source, …)   → status = Listening, loop runs on this thread
//!             ├─► handle.stop() / source exhausted → status = Stopped
//!             └─► engine failure                   → status = Halted (terminal)
//! ```
//!
//! Construction failures never produce an `Assistant`: the reporter prints the
//! backend trace and the error goes straight back to the caller.
//!
//! ## Threading
//!
//! `run` blocks. The app calls it from `tokio::task::spawn_blocking` and opens
//! the audio source inside that closure, since `cpal::Stream` is `!Send` on
//! some hosts. Everything a controller needs from other tasks lives in the
//! cloneable [`AssistantHandle`].

pub mod dispatch;
pub mod pipeline;
pub mod report;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    actuation::Actuator,
    audio::AudioSource,
    buffering::frame::{DEFAULT_FRAME_LENGTH, DEFAULT_SAMPLE_RATE},
    error::{Result, VoxlampError},
    events::{AssistantStatus, AssistantStatusEvent},
    recognition::{
        context::ContextScript, IntentEngine, IntentParams, KeywordModel, MemoryArena,
        RecognitionBackend, WakeWordEngine, WakeWordParams, DEFAULT_ARENA_BYTES,
    },
};

use self::pipeline::{DiagnosticsSnapshot, Pipeline, PipelineContext, PipelineDiagnostics, PipelineObserver};
use self::report::{report_init_failure, OrHalt};

/// Status events buffered for slow subscribers.
const BROADCAST_CAP: usize = 64;

/// Sensitivity applied to keyword models that do not set their own.
pub const DEFAULT_WAKE_SENSITIVITY: f32 = 0.75;

/// Configuration for [`Assistant`].
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Samples per frame; both engines must agree. Default: 512.
    pub frame_length: usize,
    /// Engine sample rate (Hz). Default: 16000.
    pub sample_rate: u32,
    /// Arena bytes handed to each engine. Default: 50 KiB.
    pub arena_bytes: usize,
    pub access_key: String,
    pub keywords: Vec<KeywordModel>,
    /// Compiled context blob for the intent engine.
    pub context: Vec<u8>,
    /// Default: 0.5.
    pub intent_sensitivity: f32,
    /// Default: 1.0 s.
    pub endpoint_duration_secs: f32,
    /// Default: true.
    pub require_endpoint: bool,
    /// Sleep between polls of an empty source. Zero busy-polls. Default: 1 ms.
    pub idle_poll: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            arena_bytes: DEFAULT_ARENA_BYTES,
            access_key: String::new(),
            keywords: Vec::new(),
            context: ContextScript::smart_lighting().to_bytes(),
            intent_sensitivity: 0.5,
            endpoint_duration_secs: 1.0,
            require_endpoint: true,
            idle_poll: Duration::from_millis(1),
        }
    }
}

impl AssistantConfig {
    pub fn wake_word_params(&self) -> WakeWordParams {
        WakeWordParams {
            access_key: self.access_key.clone(),
            keywords: self.keywords.clone(),
        }
    }

    pub fn intent_params(&self) -> IntentParams {
        IntentParams {
            access_key: self.access_key.clone(),
            context: self.context.clone(),
            sensitivity: self.intent_sensitivity,
            endpoint_duration_secs: self.endpoint_duration_secs,
            require_endpoint: self.require_endpoint,
        }
    }
}

/// Status cell shared between the loop thread and its handles.
///
/// `Halted` is terminal: once set, later transitions are ignored.
struct StatusBoard {
    status: Mutex<AssistantStatus>,
    tx: broadcast::Sender<AssistantStatusEvent>,
}

impl StatusBoard {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            status: Mutex::new(AssistantStatus::Idle),
            tx,
        }
    }

    fn get(&self) -> AssistantStatus {
        *self.status.lock()
    }

    fn set(&self, new_status: AssistantStatus, detail: Option<String>) {
        {
            let mut status = self.status.lock();
            if *status == AssistantStatus::Halted {
                warn!(requested = ?new_status, "assistant is halted; status change ignored");
                return;
            }
            *status = new_status;
        }
        let _ = self.tx.send(AssistantStatusEvent {
            status: new_status,
            detail,
        });
    }
}

/// Cloneable control surface for a running (or about to run) assistant.
#[derive(Clone)]
pub struct AssistantHandle {
    running: Arc<AtomicBool>,
    status: Arc<StatusBoard>,
    diagnostics: Arc<PipelineDiagnostics>,
}

impl AssistantHandle {
    /// Ask the loop to leave at the start of its next cycle. Honoured even if
    /// called before `run`.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("assistant stop requested");
        }
    }

    /// Shared with audio capture so the device callback goes quiet on stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn status(&self) -> AssistantStatus {
        self.status.get()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<AssistantStatusEvent> {
        self.status.tx.subscribe()
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}

/// Both engines, built and ready to be driven.
pub struct Assistant {
    config: AssistantConfig,
    wake_word: Box<dyn WakeWordEngine>,
    intent: Box<dyn IntentEngine>,
    running: Arc<AtomicBool>,
    status: Arc<StatusBoard>,
    diagnostics: Arc<PipelineDiagnostics>,
}

impl Assistant {
    /// Bind one arena per engine and construct the wake-word engine, then the
    /// intent engine.
    ///
    /// # Errors
    /// - `VoxlampError::EngineInit` with the backend trace when either engine
    ///   refuses to build.
    /// - `VoxlampError::ErrorTraceUnavailable` when the trace itself cannot be
    ///   fetched.
    /// - `VoxlampError::InvalidConfig` when an engine's frame length does not
    ///   match the configuration.
    pub fn bootstrap(config: AssistantConfig, backend: &mut dyn RecognitionBackend) -> Result<Self> {
        let wake_word = match backend.create_wake_word(
            &config.wake_word_params(),
            MemoryArena::new(config.arena_bytes),
        ) {
            Ok(engine) => engine,
            Err(status) => return Err(report_init_failure("wake-word", status, &mut *backend)),
        };

        let intent = match backend.create_intent(
            &config.intent_params(),
            MemoryArena::new(config.arena_bytes),
        ) {
            Ok(engine) => engine,
            Err(status) => return Err(report_init_failure("intent", status, &mut *backend)),
        };

        for (engine, frame_length) in [
            ("wake-word", wake_word.frame_length()),
            ("intent", intent.frame_length()),
        ] {
            if frame_length != config.frame_length {
                return Err(VoxlampError::InvalidConfig(format!(
                    "{engine} engine expects {frame_length}-sample frames, configured for {}",
                    config.frame_length
                )));
            }
        }

        let context_info = intent.context_info().or_halt("intent context_info")?;
        info!(
            keywords = config.keywords.len(),
            frame_length = config.frame_length,
            sample_rate = config.sample_rate,
            "engines ready"
        );
        info!("context info:\n{context_info}");

        Ok(Self {
            config,
            wake_word,
            intent,
            running: Arc::new(AtomicBool::new(true)),
            status: Arc::new(StatusBoard::new()),
            diagnostics: Arc::new(PipelineDiagnostics::default()),
        })
    }

    pub fn handle(&self) -> AssistantHandle {
        AssistantHandle {
            running: Arc::clone(&self.running),
            status: Arc::clone(&self.status),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }

    /// Drive the loop on the calling thread until stop, exhaustion or a fatal
    /// error. A fatal error leaves the status `Halted` and is returned as-is.
    pub fn run(
        self,
        source: Box<dyn AudioSource>,
        actuator: Box<dyn Actuator>,
        observer: Box<dyn PipelineObserver>,
    ) -> Result<()> {
        let status = Arc::clone(&self.status);
        self.diagnostics.reset();
        status.set(AssistantStatus::Listening, None);

        let outcome = Pipeline::new(PipelineContext {
            config: self.config,
            wake_word: self.wake_word,
            intent: self.intent,
            source,
            actuator,
            observer,
            running: self.running,
            diagnostics: self.diagnostics,
        })
        .and_then(Pipeline::run);

        match outcome {
            Ok(()) => {
                status.set(AssistantStatus::Stopped, None);
                Ok(())
            }
            Err(e) => {
                status.set(AssistantStatus::Halted, Some(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::energy::{EnergyBackend, EnergyBackendConfig};
    use crate::recognition::StatusCode;

    fn config() -> AssistantConfig {
        AssistantConfig {
            access_key: "test-key".into(),
            keywords: vec![KeywordModel::new(vec![1, 2, 3], DEFAULT_WAKE_SENSITIVITY)],
            ..AssistantConfig::default()
        }
    }

    #[test]
    fn defaults_match_the_appliance() {
        let config = AssistantConfig::default();
        assert_eq!(config.frame_length, 512);
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.arena_bytes, 50 * 1024);
        assert!(config.require_endpoint);
        assert_eq!(config.idle_poll, Duration::from_millis(1));
        assert!(ContextScript::parse(&config.context).is_ok());
    }

    #[test]
    fn bootstrap_starts_idle_and_armed() {
        let mut backend = EnergyBackend::new(EnergyBackendConfig::default());
        let assistant = Assistant::bootstrap(config(), &mut backend).expect("bootstrap");
        let handle = assistant.handle();
        assert_eq!(handle.status(), AssistantStatus::Idle);
        assert!(assistant.running.load(Ordering::SeqCst));
    }

    #[test]
    fn tiny_arena_fails_wake_word_first() {
        let mut backend = EnergyBackend::new(EnergyBackendConfig::default());
        let err = Assistant::bootstrap(
            AssistantConfig {
                arena_bytes: 1024,
                ..config()
            },
            &mut backend,
        )
        .err()
        .expect("arena too small");
        assert!(matches!(
            err,
            VoxlampError::EngineInit {
                engine: "wake-word",
                status: StatusCode::OutOfMemory,
                ..
            }
        ));
        assert_eq!(backend.outstanding_traces(), 0);
    }

    #[test]
    fn halted_is_terminal() {
        let board = StatusBoard::new();
        let mut rx = board.tx.subscribe();
        board.set(AssistantStatus::Halted, Some("boom".into()));
        board.set(AssistantStatus::Stopped, None);
        assert_eq!(board.get(), AssistantStatus::Halted);
        assert_eq!(
            rx.try_recv().expect("halt event").status,
            AssistantStatus::Halted
        );
        assert!(rx.try_recv().is_err());
    }
}
