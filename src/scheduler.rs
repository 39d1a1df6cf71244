use crate::error::{panic_message, EngineError, EngineResult};
use crate::warnings::RuntimeWarning;

use async_task::{Builder, Runnable};
use core_affinity::CoreId;
use crossbeam::deque::{Injector, Steal};
use crossbeam::sync::{Parker, Unparker};
use futures::FutureExt;
use std::cell::Cell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

static TASK_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_PE: Cell<Option<usize>> = Cell::new(None);
}

/// Return the PE id of the calling worker thread, or `None` if called from a thread that
/// does not belong to a worker pool (e.g. the thread driving an algorithm).
pub fn current_pe() -> Option<usize> {
    CURRENT_PE.with(|pe| pe.get())
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SchedulerStatus {
    Active,
    Finished,
}

type TaskQueue = Arc<Injector<Runnable<usize>>>;

struct PeQueue {
    inj: TaskQueue,
    unparker: Unparker,
}

struct WorkerThread {
    pe: usize,
    inj: TaskQueue,
    parker: Parker,
    status: Arc<AtomicU8>,
}

impl WorkerThread {
    fn run(
        worker: WorkerThread,
        active_cnt: Arc<AtomicUsize>,
        core: Option<CoreId>,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        let builder = thread::Builder::new().name(format!("strata_pe_{}", worker.pe));
        builder.spawn(move || {
            CURRENT_PE.with(|pe| pe.set(Some(worker.pe)));
            if let Some(core) = core {
                core_affinity::set_for_current(core);
            }
            tracing::debug!(pe = worker.pe, ?core, "worker thread running");
            active_cnt.fetch_add(1, Ordering::SeqCst);
            while worker.status.load(Ordering::SeqCst) == SchedulerStatus::Active as u8
                || !worker.inj.is_empty()
            {
                match worker.inj.steal() {
                    Steal::Success(runnable) => {
                        if let Err(payload) =
                            std::panic::catch_unwind(AssertUnwindSafe(|| runnable.run()))
                        {
                            tracing::error!(
                                pe = worker.pe,
                                "task panicked: {}",
                                panic_message(&*payload)
                            );
                        }
                    }
                    Steal::Retry => {}
                    Steal::Empty => worker.parker.park_timeout(Duration::from_millis(10)),
                }
            }
            active_cnt.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(pe = worker.pe, "worker thread shutting down");
        })
    }
}

/// A fixed pool of worker threads, one per PE, each draining its own FIFO queue.
///
/// Tasks submitted to a PE run on that PE's thread in submission order, so every
/// operation against a partition can be delegated to the partition's owner.
pub(crate) struct Scheduler {
    queues: Vec<PeQueue>,
    threads: Vec<thread::JoinHandle<()>>,
    status: Arc<AtomicU8>,
    active_cnt: Arc<AtomicUsize>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("num_pes", &self.queues.len())
            .field("active_threads", &self.active_cnt.load(Ordering::Relaxed))
            .finish()
    }
}

impl Scheduler {
    pub(crate) fn new(num_pes: usize, pin_workers: bool) -> Scheduler {
        assert!(num_pes > 0, "a scheduler requires at least one pe");
        let status = Arc::new(AtomicU8::new(SchedulerStatus::Active as u8));
        let active_cnt = Arc::new(AtomicUsize::new(0));
        let cores = if pin_workers {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };
        let mut queues = Vec::with_capacity(num_pes);
        let mut threads = Vec::with_capacity(num_pes);
        for pe in 0..num_pes {
            let inj: TaskQueue = Arc::new(Injector::new());
            let parker = Parker::new();
            let unparker = parker.unparker().clone();
            let core = if cores.is_empty() {
                None
            } else {
                Some(cores[pe % cores.len()])
            };
            let worker = WorkerThread {
                pe,
                inj: inj.clone(),
                parker,
                status: status.clone(),
            };
            match WorkerThread::run(worker, active_cnt.clone(), core) {
                Ok(handle) => threads.push(handle),
                Err(e) => panic!("unable to spawn worker thread for pe {}: {}", pe, e),
            }
            queues.push(PeQueue { inj, unparker });
        }
        Scheduler {
            queues,
            threads,
            status,
            active_cnt,
        }
    }

    pub(crate) fn num_pes(&self) -> usize {
        self.queues.len()
    }

    fn build_task<F>(
        &self,
        pe: usize,
        task: F,
    ) -> (Runnable<usize>, async_task::Task<F::Output, usize>)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        assert!(pe < self.queues.len(), "invalid pe: {:?}", pe);
        let task_id = TASK_ID.fetch_add(1, Ordering::Relaxed);
        let inj = self.queues[pe].inj.clone();
        let unparker = self.queues[pe].unparker.clone();
        let schedule = move |runnable| {
            inj.push(runnable);
            unparker.unpark();
        };
        Builder::new()
            .metadata(task_id)
            .spawn(move |_task_id| task, schedule)
    }

    /// Fire-and-forget submission to `pe`'s queue
    pub(crate) fn submit_task_pe<F>(&self, pe: usize, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (runnable, task) = self.build_task(pe, task);
        runnable.schedule();
        task.detach();
    }

    pub(crate) fn spawn_task_pe<F>(self: &Arc<Self>, pe: usize, task: F) -> EngineTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (runnable, task) = self.build_task(pe, AssertUnwindSafe(task).catch_unwind());
        runnable.schedule();
        EngineTask {
            task,
            pe,
            scheduler: self.clone(),
        }
    }

    /// Run a single queued task of `pe` on the calling thread, returns false if the queue was empty
    pub(crate) fn exec_task(&self, pe: usize) -> bool {
        match self.queues[pe].inj.steal() {
            Steal::Success(runnable) => {
                runnable.run();
                true
            }
            _ => false,
        }
    }

    /// Block the calling thread until `future` completes.
    ///
    /// On a worker thread the worker keeps draining its own queue while waiting.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match current_pe() {
            Some(pe) if pe < self.num_pes() => {
                let waker = futures::task::noop_waker();
                let mut cx = Context::from_waker(&waker);
                let mut future = std::pin::pin!(future);
                loop {
                    if let Poll::Ready(val) = future.as_mut().poll(&mut cx) {
                        return val;
                    }
                    if !self.exec_task(pe) {
                        thread::yield_now();
                    }
                }
            }
            _ => futures::executor::block_on(future),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.status
            .store(SchedulerStatus::Finished as u8, Ordering::SeqCst);
        for queue in &self.queues {
            queue.unparker.unpark();
        }
        let me = thread::current().id();
        for handle in self.threads.drain(..) {
            if handle.thread().id() != me {
                let _ = handle.join();
            }
        }
        tracing::debug!("scheduler shut down");
    }
}

/// A handle to a task executing on a specific PE.
///
/// The task runs regardless of whether the handle is polled; the handle is used to retrieve
/// the result either by `.await`ing it or by calling [EngineTask::block].
#[must_use = "this handle is used to retrieve the result of the task. Call '.await' on it in an async context or '.block()' otherwise, or 'detach()' if the result is not needed"]
pub struct EngineTask<T> {
    task: async_task::Task<std::thread::Result<T>, usize>,
    pe: usize,
    scheduler: Arc<Scheduler>,
}

impl<T: Send + 'static> EngineTask<T> {
    /// The PE executing this task
    pub fn pe(&self) -> usize {
        self.pe
    }

    /// Block the calling thread until the task has finished.
    pub fn block(self) -> EngineResult<T> {
        RuntimeWarning::BlockingCall("EngineTask::block", "<task>.await").print();
        let scheduler = self.scheduler.clone();
        scheduler.block_on(self)
    }

    /// Let the task run to completion without waiting for its result.
    pub fn detach(self) {
        self.task.detach()
    }
}

impl<T> Future for EngineTask<T> {
    type Output = EngineResult<T>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let pe = self.pe;
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Ready(Ok(val)) => Poll::Ready(Ok(val)),
            Poll::Ready(Err(payload)) => Poll::Ready(Err(EngineError::WorkerPanic {
                pe,
                msg: panic_message(&*payload),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
