//! Halt-and-report policy for engine failures.
//!
//! Every non-success status is printed once, in generation order, and turned
//! into a fatal [`VoxlampError`]. Nothing here retries; the caller's only move
//! is to propagate the error to the entry point, which halts.

use tracing::error;

use crate::error::VoxlampError;
use crate::recognition::{EngineDiagnostics, EngineResult, StatusCode};

/// Report a mid-stream engine call failure. No trace is available at this
/// point, only the status.
pub fn report_call_failure(operation: &'static str, status: StatusCode) -> VoxlampError {
    error!(operation, %status, "{operation} failed with '{status}'");
    VoxlampError::EngineCall { operation, status }
}

/// Report an engine construction failure: print the status, then pull the
/// backend's diagnostic trace, print each line with its index and hand the
/// trace back.
pub fn report_init_failure<D: EngineDiagnostics + ?Sized>(
    engine: &'static str,
    status: StatusCode,
    diagnostics: &mut D,
) -> VoxlampError {
    let description = diagnostics.describe_status(status);
    error!(engine, %status, "{engine} init failed with '{description}':");

    let trace = match diagnostics.error_trace() {
        Ok(trace) => trace,
        Err(trace_status) => {
            let trace_description = diagnostics.describe_status(trace_status);
            error!(
                engine,
                status = %trace_status,
                "unable to get {engine} error state with '{trace_description}'"
            );
            return VoxlampError::ErrorTraceUnavailable {
                engine,
                status: trace_status,
            };
        }
    };

    for (idx, line) in trace.lines().iter().enumerate() {
        error!(engine, "[{idx}] {line}");
    }
    let lines = trace.lines().to_vec();
    diagnostics.release_error_trace(trace);

    VoxlampError::EngineInit {
        engine,
        status,
        trace: lines,
    }
}

/// `?`-friendly reporting for per-call engine results.
pub trait OrHalt<T> {
    fn or_halt(self, operation: &'static str) -> Result<T, VoxlampError>;
}

impl<T> OrHalt<T> for EngineResult<T> {
    fn or_halt(self, operation: &'static str) -> Result<T, VoxlampError> {
        self.map_err(|status| report_call_failure(operation, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::ErrorTrace;

    struct FakeDiagnostics {
        trace: Option<Vec<String>>,
        released: Vec<usize>,
    }

    impl EngineDiagnostics for FakeDiagnostics {
        fn describe_status(&self, status: StatusCode) -> String {
            format!("{status} (fake)")
        }

        fn error_trace(&mut self) -> EngineResult<ErrorTrace> {
            self.trace
                .take()
                .map(ErrorTrace::new)
                .ok_or(StatusCode::RuntimeError)
        }

        fn release_error_trace(&mut self, trace: ErrorTrace) {
            self.released.push(trace.depth());
        }
    }

    #[test]
    fn init_failure_carries_and_releases_full_trace() {
        let mut diagnostics = FakeDiagnostics {
            trace: Some(vec!["first".into(), "second".into(), "third".into()]),
            released: vec![],
        };
        let err = report_init_failure("wake-word", StatusCode::KeyError, &mut diagnostics);
        match err {
            VoxlampError::EngineInit {
                engine,
                status,
                trace,
            } => {
                assert_eq!(engine, "wake-word");
                assert_eq!(status, StatusCode::KeyError);
                assert_eq!(trace, vec!["first", "second", "third"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(diagnostics.released, vec![3]);
    }

    #[test]
    fn unavailable_trace_is_its_own_error() {
        let mut diagnostics = FakeDiagnostics {
            trace: None,
            released: vec![],
        };
        let err = report_init_failure("intent", StatusCode::IoError, &mut diagnostics);
        assert!(matches!(
            err,
            VoxlampError::ErrorTraceUnavailable {
                engine: "intent",
                status: StatusCode::RuntimeError
            }
        ));
        assert!(diagnostics.released.is_empty());
    }

    #[test]
    fn or_halt_names_the_operation() {
        let result: EngineResult<bool> = Err(StatusCode::InvalidState);
        let err = result.or_halt("intent process").expect_err("fatal");
        assert_eq!(err.to_string(), "intent process failed with 'INVALID_STATE'");
        assert_eq!(err.status(), Some(StatusCode::InvalidState));

        let ok: EngineResult<u8> = Ok(3);
        assert_eq!(ok.or_halt("unused").expect("ok passes through"), 3);
    }
}
