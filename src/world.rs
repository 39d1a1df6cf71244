use crate::barrier::Barrier;
use crate::completion::CompletionEvent;
use crate::config;
use crate::error::EngineResult;
use crate::scheduler::{current_pe, EngineTask, Scheduler};
use crate::warnings::RuntimeWarning;

use futures::Future;
use std::sync::Arc;
use std::time::Duration;

/// An abstraction representing all the PEs (workers) of an execution.
///
/// Constructing a World starts a fixed pool of worker threads, one per PE; every
/// [PartitionedArray][crate::PartitionedArray] allocated from the world has exactly one
/// partition per PE. Cloning a World is cheap, the workers are shut down once the last
/// handle (including those held by arrays) is dropped.
#[derive(Clone, Debug)]
pub struct World {
    inner: Arc<WorldInner>,
}

#[derive(Debug)]
struct WorldInner {
    num_pes: usize,
    scheduler: Arc<Scheduler>,
    barrier: Barrier,
    counters: CompletionEvent,
    deadlock_timeout: Option<Duration>,
}

impl World {
    /// Return the number of PEs in the execution
    pub fn num_pes(&self) -> usize {
        self.inner.num_pes
    }

    /// Return the PE id of the calling thread, `None` when called from outside the worker pool
    pub fn my_pe(&self) -> Option<usize> {
        current_pe().filter(|pe| *pe < self.inner.num_pes)
    }

    pub(crate) fn scheduler(&self) -> &Arc<Scheduler> {
        &self.inner.scheduler
    }

    /// The event tracking asynchronous operations issued outside of any iteration call
    pub(crate) fn counters(&self) -> &CompletionEvent {
        &self.inner.counters
    }

    pub fn deadlock_timeout(&self) -> Option<Duration> {
        self.inner.deadlock_timeout
    }

    /// Wait for all asynchronous operations issued outside of an iteration call to complete
    #[tracing::instrument(skip_all)]
    pub fn wait_all(&self) -> EngineResult<()> {
        self.wait_event(&self.inner.counters)
    }

    /// Wait for `event`, bounded by this world's deadlock timeout
    pub fn wait_event(&self, event: &CompletionEvent) -> EngineResult<()> {
        event.wait_timeout(self.inner.deadlock_timeout)
    }

    /// Synchronize with every PE: returns once every PE has executed all work submitted to it
    /// before the barrier.
    #[tracing::instrument(skip_all)]
    pub fn barrier(&self) -> EngineResult<()> {
        RuntimeWarning::BlockingCall("World::barrier", "a barrier on the driving thread").print();
        self.inner.barrier.barrier()
    }

    /// Spawn `task` on the queue of `pe`, returning a handle to its result
    pub fn spawn_on<F>(&self, pe: usize, task: F) -> EngineTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner.scheduler.spawn_task_pe(pe, task)
    }

    /// Run a future to completion on the calling thread
    pub fn block_on<F: Future>(&self, f: F) -> F::Output {
        RuntimeWarning::BlockingCall("World::block_on", "<future>.await").print();
        tracing::trace_span!("block_on").in_scope(|| self.inner.scheduler.block_on(f))
    }
}

/// An implementation of the Builder design pattern, used to construct an instance of a World.
///
/// Defaults come from the `STRATA_` environment configuration (see [config][crate::config]).
///
/// # Examples
///
///```
/// use strata::WorldBuilder;
///
/// let world = WorldBuilder::new()
///                 .with_num_pes(4)
///                 .with_deadlock_timeout(30.0)
///                 .build();
///```
#[derive(Debug, Default)]
pub struct WorldBuilder {
    num_pes: Option<usize>,
    deadlock_timeout: Option<f64>,
    pin_workers: Option<bool>,
}

impl WorldBuilder {
    /// Construct a new world builder
    pub fn new() -> WorldBuilder {
        WorldBuilder::default()
    }

    /// Specify the number of PEs (worker threads)
    pub fn with_num_pes(mut self, num_pes: usize) -> WorldBuilder {
        self.num_pes = Some(num_pes);
        self
    }

    /// Specify the deadlock timeout in seconds, a value <= 0.0 disables it
    pub fn with_deadlock_timeout(mut self, seconds: f64) -> WorldBuilder {
        self.deadlock_timeout = Some(seconds);
        self
    }

    /// Pin each worker thread to a core
    pub fn with_pinned_workers(mut self, pin: bool) -> WorldBuilder {
        self.pin_workers = Some(pin);
        self
    }

    /// Instantiate a World object
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> World {
        let num_pes = self.num_pes.unwrap_or(config().num_pes);
        assert!(num_pes > 0, "a world requires at least one pe");
        let timeout = self.deadlock_timeout.unwrap_or(config().deadlock_timeout);
        let deadlock_timeout = if timeout > 0.0 {
            Some(Duration::from_secs_f64(timeout))
        } else {
            None
        };
        let scheduler = Arc::new(Scheduler::new(
            num_pes,
            self.pin_workers.unwrap_or(config().pin_workers),
        ));
        let barrier = Barrier::new(scheduler.clone(), deadlock_timeout);
        tracing::debug!(num_pes, ?deadlock_timeout, "world built");
        World {
            inner: Arc::new(WorldInner {
                num_pes,
                scheduler,
                barrier,
                counters: CompletionEvent::new(),
                deadlock_timeout,
            }),
        }
    }
}
