use crate::config;
use crate::error::{EngineError, EngineResult};
use crate::warnings::RuntimeWarning;

use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

thread_local! {
    static ENCLOSING: RefCell<Option<CompletionEvent>> = RefCell::new(None);
}

#[derive(Debug, Default)]
struct CompletionInner {
    outstanding: AtomicUsize,
    failure: Mutex<Option<EngineError>>,
    lock: Mutex<()>,
    cvar: Condvar,
}

/// A shared counter of outstanding operations, decremented by every finishing task.
///
/// Parallel iteration calls enroll each launched chunk, and every asynchronous array
/// operation issued from inside a chunk is enrolled in that call's event as well, so once
/// [CompletionEvent::wait] returns all of their writes are visible.
#[derive(Clone, Debug, Default)]
pub struct CompletionEvent {
    inner: Arc<CompletionInner>,
}

impl CompletionEvent {
    pub fn new() -> CompletionEvent {
        CompletionEvent::default()
    }

    /// Register `num` outstanding operations
    pub fn enroll(&self, num: usize) {
        self.inner.outstanding.fetch_add(num, Ordering::SeqCst);
    }

    /// Mark `num` operations as finished
    pub fn complete(&self, num: usize) {
        let prev = self.inner.outstanding.fetch_sub(num, Ordering::SeqCst);
        assert!(prev >= num, "completed more operations than were enrolled");
        if prev == num {
            let _guard = self.inner.lock.lock();
            self.inner.cvar.notify_all();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Record a failure, reported by the next call to wait. The first failure wins.
    pub(crate) fn fail(&self, error: EngineError) {
        let mut failure = self.inner.failure.lock();
        if failure.is_none() {
            *failure = Some(error);
        }
    }

    /// Wait for every enrolled operation, bounded by the configured deadlock timeout.
    pub fn wait(&self) -> EngineResult<()> {
        let timeout = config().deadlock_timeout;
        self.wait_timeout(if timeout > 0.0 {
            Some(Duration::from_secs_f64(timeout))
        } else {
            None
        })
    }

    /// Wait for every enrolled operation; `None` waits forever.
    pub fn wait_timeout(&self, timeout: Option<Duration>) -> EngineResult<()> {
        RuntimeWarning::BlockingCall(
            "CompletionEvent::wait",
            "forall_async and wait from the driving thread",
        )
        .print();
        let start = Instant::now();
        let mut guard = self.inner.lock.lock();
        while self.outstanding() > 0 {
            self.inner.cvar.wait_for(&mut guard, Duration::from_millis(100));
            if let Some(timeout) = timeout {
                let elapsed = start.elapsed();
                if elapsed > timeout && self.outstanding() > 0 {
                    RuntimeWarning::DeadlockTimeout(
                        "CompletionEvent::wait",
                        elapsed.as_secs_f64(),
                        timeout.as_secs_f64(),
                    )
                    .print();
                    return Err(EngineError::Timeout {
                        what: "completion event",
                        elapsed: elapsed.as_secs_f64(),
                        outstanding: self.outstanding(),
                    });
                }
            }
        }
        drop(guard);
        match self.inner.failure.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// The event of the iteration call whose chunk is running on this thread, if any
pub(crate) fn enclosing_event() -> Option<CompletionEvent> {
    ENCLOSING.with(|event| event.borrow().clone())
}

struct RestoreEnclosing(Option<CompletionEvent>);

impl Drop for RestoreEnclosing {
    fn drop(&mut self) {
        let prev = self.0.take();
        ENCLOSING.with(|event| *event.borrow_mut() = prev);
    }
}

/// Run `op` with `event` as the enclosing event of this thread
pub(crate) fn with_enclosing<R>(event: &CompletionEvent, op: impl FnOnce() -> R) -> R {
    let prev = ENCLOSING.with(|cur| cur.borrow_mut().replace(event.clone()));
    let _restore = RestoreEnclosing(prev);
    op()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_returns_when_drained() {
        let event = CompletionEvent::new();
        event.enroll(3);
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let event = event.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(20));
                    event.complete(1);
                })
            })
            .collect();
        assert_eq!(Ok(()), event.wait_timeout(Some(Duration::from_secs(10))));
        assert_eq!(0, event.outstanding());
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn wait_times_out() {
        let event = CompletionEvent::new();
        event.enroll(1);
        match event.wait_timeout(Some(Duration::from_millis(50))) {
            Err(EngineError::Timeout { outstanding, .. }) => assert_eq!(1, outstanding),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn failure_is_reported_once() {
        let event = CompletionEvent::new();
        event.fail(EngineError::WorkerPanic {
            pe: 1,
            msg: "first".into(),
        });
        event.fail(EngineError::WorkerPanic {
            pe: 2,
            msg: "second".into(),
        });
        assert_eq!(
            Err(EngineError::WorkerPanic {
                pe: 1,
                msg: "first".into()
            }),
            event.wait_timeout(None)
        );
        assert_eq!(Ok(()), event.wait_timeout(None));
    }

    #[test]
    fn enclosing_event_is_scoped() {
        assert!(enclosing_event().is_none());
        let event = CompletionEvent::new();
        with_enclosing(&event, || {
            let inner = enclosing_event().unwrap();
            inner.enroll(1);
        });
        assert!(enclosing_event().is_none());
        assert_eq!(1, event.outstanding());
    }
}
