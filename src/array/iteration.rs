use crate::array::{Dist, PartitionedArray};
use crate::completion::CompletionEvent;
use crate::error::EngineResult;
use crate::forall::launch_chunk;

use std::sync::Arc;

impl<T: Dist> PartitionedArray<T> {
    /// Call `op(index, value)` for every element, each PE visiting exactly the elements it
    /// owns, and return once every PE has finished, every asynchronous operation issued by
    /// `op` has completed and a barrier has been crossed.
    ///
    /// `value` is a copy taken when the element is visited; `op` may freely read or write
    /// any array, including this one.
    #[tracing::instrument(skip_all, fields(id = self.inner.id))]
    pub fn for_each<F>(&self, op: F) -> EngineResult<()>
    where
        F: Fn(usize, T) + Send + Sync + 'static,
    {
        let event = CompletionEvent::new();
        self.for_each_async(op, &event);
        self.world.wait_event(&event)?;
        self.world.barrier()
    }

    /// Launch `op(index, value)` for every element on its owning PE, enrolled in `event`,
    /// returning once every chunk has been dispatched.
    pub fn for_each_async<F>(&self, op: F, event: &CompletionEvent)
    where
        F: Fn(usize, T) + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        for pe in 0..self.num_pes() {
            let local = self.local_range(pe);
            if local.is_empty() {
                continue;
            }
            let op = op.clone();
            let inner = self.inner.clone();
            launch_chunk(self.world.scheduler(), pe, event, move || {
                for (offset, index) in local.enumerate() {
                    let val = inner.partitions[pe].read()[offset];
                    op(index, val);
                }
            });
        }
    }

    /// Call `op(index, &mut value)` for every element on its owning PE, synchronously.
    ///
    /// Each PE holds the exclusive lock of its own partition for the duration of its
    /// chunk, so `op` must not access this array (other arrays are fine).
    #[tracing::instrument(skip_all, fields(id = self.inner.id))]
    pub fn for_each_mut<F>(&self, op: F) -> EngineResult<()>
    where
        F: Fn(usize, &mut T) + Send + Sync + 'static,
    {
        let event = CompletionEvent::new();
        let op = Arc::new(op);
        for pe in 0..self.num_pes() {
            let local = self.local_range(pe);
            if local.is_empty() {
                continue;
            }
            let op = op.clone();
            let inner = self.inner.clone();
            launch_chunk(self.world.scheduler(), pe, &event, move || {
                let mut partition = inner.partitions[pe].write();
                for (elem, index) in partition.iter_mut().zip(local) {
                    op(index, elem);
                }
            });
        }
        self.world.wait_event(&event)?;
        self.world.barrier()
    }

    /// Set every element to `val`
    pub fn fill(&self, val: T) -> EngineResult<()> {
        self.for_each_mut(move |_, elem| *elem = val)
    }
}
