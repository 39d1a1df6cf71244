use crate::config;
use crate::scheduler::current_pe;

/// Diagnostics about engine usage that may lead to stalls; logged, never fatal.
pub(crate) enum RuntimeWarning<'a> {
    /// (blocking call, non-blocking alternative)
    BlockingCall(&'a str, &'a str),
    /// (waiter, elapsed seconds, timeout seconds)
    DeadlockTimeout(&'a str, f64, f64),
}

impl<'a> RuntimeWarning<'a> {
    fn enabled(&self) -> bool {
        match self {
            // only worth reporting when a worker could end up waiting on its own queue
            RuntimeWarning::BlockingCall(..) => {
                current_pe().is_some() && config().blocking_call_warning.unwrap_or(true)
            }
            RuntimeWarning::DeadlockTimeout(..) => true,
        }
    }

    pub(crate) fn print(self) {
        if !self.enabled() {
            return;
        }
        match self {
            RuntimeWarning::BlockingCall(func, alternative) => {
                tracing::warn!(
                    "[STRATA WARNING] {func} called from a worker thread (pe {:?}), this may stall the pe's queue! \
                    Consider '{alternative}' instead. Set STRATA_BLOCKING_CALL_WARNING=false to disable this warning.",
                    current_pe()
                );
            }
            RuntimeWarning::DeadlockTimeout(what, elapsed, timeout) => {
                tracing::warn!(
                    "[STRATA WARNING][{:?}] {what} has been waiting for {elapsed:.3}s, potential deadlock detected. \
                    Barriers and completion events require every PE to drain its queue; blocking inside a per-element \
                    operation prevents that. The timeout is {timeout} seconds and can be set via the \
                    STRATA_DEADLOCK_TIMEOUT environment variable.",
                    std::thread::current().name().unwrap_or("<unnamed>"),
                );
            }
        }
    }
}
