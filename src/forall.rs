//! The parallel iteration engine.
//!
//! A range (or an array) is split with the [BlockDistribution] rule and one chunk task per
//! PE is placed on that PE's queue. Each chunk is enrolled in a [CompletionEvent]; while
//! a chunk runs, the event is the *enclosing* event of the worker thread, so asynchronous
//! array operations issued by the per-element op are enrolled in it too.
use crate::completion::{with_enclosing, CompletionEvent};
use crate::distribution::BlockDistribution;
use crate::error::{panic_message, EngineError, EngineResult};
use crate::scheduler::Scheduler;
use crate::World;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub(crate) struct ForEachChunk<F> {
    pub(crate) op: Arc<F>,
    pub(crate) start_i: usize,
    pub(crate) end_i: usize,
}

impl<F> ForEachChunk<F>
where
    F: Fn(usize) + Send + Sync + 'static,
{
    fn exec(&self) {
        for i in self.start_i..self.end_i {
            (self.op)(i);
        }
    }
}

/// Place `chunk` on `pe`'s queue, enrolled in `event`.
///
/// A panic raised by the chunk is caught on the worker and recorded in the event.
pub(crate) fn launch_chunk<C>(scheduler: &Scheduler, pe: usize, event: &CompletionEvent, chunk: C)
where
    C: FnOnce() + Send + 'static,
{
    event.enroll(1);
    let event = event.clone();
    scheduler.submit_task_pe(pe, async move {
        let res = with_enclosing(&event, || std::panic::catch_unwind(AssertUnwindSafe(chunk)));
        if let Err(payload) = res {
            let msg = panic_message(&*payload);
            tracing::debug!(pe, %msg, "chunk panicked");
            event.fail(EngineError::WorkerPanic { pe, msg });
        }
        event.complete(1);
    });
}

impl World {
    /// Execute `op` once for every index of `range`, partitioned across all PEs, and return
    /// once every PE has finished its share, every asynchronous operation issued by `op`
    /// has completed and a barrier has been crossed.
    ///
    /// # Examples
    ///```
    /// let counts = PartitionedArray::<usize>::new(&world, 10);
    /// let c = counts.clone();
    /// world.forall(0..100, move |i| c.add(i % 10, 1))?;
    /// assert_eq!(vec![10; 10], counts.to_vec());
    ///```
    #[tracing::instrument(skip_all, fields(start = range.start, end = range.end))]
    pub fn forall<F>(&self, range: std::ops::Range<usize>, op: F) -> EngineResult<()>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let event = CompletionEvent::new();
        self.forall_async(range, op, &event);
        self.wait_event(&event)?;
        self.barrier()
    }

    /// Launch `op` for every index of `range` across all PEs and return once every chunk has
    /// been dispatched. All chunks, and every asynchronous operation they issue, are enrolled
    /// in `event`; results may only be relied upon after `event` has been waited on.
    pub fn forall_async<F>(&self, range: std::ops::Range<usize>, op: F, event: &CompletionEvent)
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let dist = BlockDistribution::new(range.len(), self.num_pes());
        let op = Arc::new(op);
        for pe in 0..self.num_pes() {
            let local = dist.local_range(pe);
            if local.is_empty() {
                continue;
            }
            let chunk = ForEachChunk {
                op: op.clone(),
                start_i: range.start + local.start,
                end_i: range.start + local.end,
            };
            tracing::trace!(pe, start = chunk.start_i, end = chunk.end_i, "launching chunk");
            launch_chunk(self.scheduler(), pe, event, move || chunk.exec());
        }
    }
}
