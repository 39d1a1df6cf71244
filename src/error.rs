use std::any::Any;

/// Errors surfaced to the caller of an engine operation.
///
/// Every variant is fatal to the current run: partially applied iterations leave the
/// global state inconsistent, so nothing is retried.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A completion event or barrier was still outstanding after the deadlock timeout.
    Timeout {
        what: &'static str,
        elapsed: f64,
        outstanding: usize,
    },
    /// A per-element operation panicked on a worker (e.g. an out of bounds access).
    WorkerPanic { pe: usize, msg: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EngineError::Timeout {
                what,
                elapsed,
                outstanding,
            } => write!(
                f,
                "{} timed out after {:.3}s with {} outstanding operations",
                what, elapsed, outstanding
            ),
            EngineError::WorkerPanic { pe, msg } => {
                write!(f, "operation panicked on pe {}: {}", pe, msg)
            }
        }
    }
}

impl std::error::Error for EngineError {}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
