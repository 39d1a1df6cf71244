//! Single element ("delegate") operations against any index of a [PartitionedArray],
//! regardless of which PE owns it.
//!
//! Synchronous operations lock the owning partition directly and have completed when they
//! return. Asynchronous operations are delegated to the owning PE's queue (or applied in
//! place when the caller already runs on the owner) and are enrolled in the enclosing
//! iteration call's [CompletionEvent][crate::CompletionEvent], or in the world's counters when
//! issued outside of one (see [World::wait_all][crate::World::wait_all]).
use crate::array::{Dist, ElementArithmeticOps, PartitionedArray};
use crate::completion::enclosing_event;
use crate::error::{panic_message, EngineError};
use crate::scheduler::EngineTask;

use std::panic::AssertUnwindSafe;

impl<T: Dist> PartitionedArray<T> {
    /// Return the element at `index`, blocking until it has been fetched from its owner.
    ///
    /// Panics if `index` is out of bounds.
    pub fn read(&self, index: usize) -> T {
        let (pe, offset) = self.locate(index);
        tracing::trace!(id = self.inner.id, index, pe, "read");
        self.inner.partitions[pe].read()[offset]
    }

    /// Store `val` at `index`, visible to every PE when this returns.
    ///
    /// Panics if `index` is out of bounds.
    pub fn write(&self, index: usize, val: T) {
        let (pe, offset) = self.locate(index);
        tracing::trace!(id = self.inner.id, index, pe, "write");
        self.inner.partitions[pe].write()[offset] = val;
    }

    /// Store `val` at `index` without waiting for the owner.
    ///
    /// The write is only guaranteed visible once the enclosing iteration call has completed
    /// (or after [World::wait_all][crate::World::wait_all] when issued outside of one).
    ///
    /// Panics if `index` is out of bounds.
    pub fn write_async(&self, index: usize, val: T) {
        self.delegate(index, move |elem| *elem = val);
    }

    /// Fetch the element at `index` on its owning PE.
    pub fn read_async(&self, index: usize) -> EngineTask<T> {
        let (pe, offset) = self.locate(index);
        let inner = self.inner.clone();
        self.world
            .spawn_on(pe, async move { inner.partitions[pe].read()[offset] })
    }

    /// Copy `buf` into the array starting at global `index`, spanning partitions as needed.
    pub fn put_slice(&self, index: usize, buf: &[T]) {
        for (pe, local, buf_range) in self.segments(index, buf.len()) {
            self.inner.partitions[pe].write()[local].copy_from_slice(&buf[buf_range]);
        }
    }

    /// Copy `len` elements starting at global `index` out of the array.
    pub fn get_slice(&self, index: usize, len: usize) -> Vec<T> {
        let mut buf = Vec::with_capacity(len);
        for (pe, local, _) in self.segments(index, len) {
            buf.extend_from_slice(&self.inner.partitions[pe].read()[local]);
        }
        buf
    }

    /// Copy the whole array, in index order
    pub fn to_vec(&self) -> Vec<T> {
        self.get_slice(0, self.len())
    }

    /// Split the global span `[index, index + len)` into (pe, partition range, buffer range) pieces
    fn segments(
        &self,
        index: usize,
        len: usize,
    ) -> Vec<(usize, std::ops::Range<usize>, std::ops::Range<usize>)> {
        let mut segments = vec![];
        if len == 0 {
            return segments;
        }
        let start_pe = self.owner(index);
        let end_pe = self.owner(index + len - 1);
        let mut dist_index = index;
        let mut buf_index = 0;
        for pe in start_pe..=end_pe {
            let pe_range = self.local_range(pe);
            let offset = dist_index - pe_range.start;
            let num = std::cmp::min(pe_range.len().saturating_sub(offset), len - buf_index);
            if num > 0 {
                segments.push((pe, offset..offset + num, buf_index..buf_index + num));
                buf_index += num;
                dist_index += num;
            }
        }
        segments
    }

    pub(crate) fn delegate<F>(&self, index: usize, op: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let (pe, offset) = self.locate(index);
        if self.world.my_pe() == Some(pe) {
            tracing::trace!(id = self.inner.id, index, pe, "local delegate");
            op(&mut self.inner.partitions[pe].write()[offset]);
            return;
        }
        let event = enclosing_event().unwrap_or_else(|| self.world.counters().clone());
        event.enroll(1);
        tracing::trace!(id = self.inner.id, index, pe, "remote delegate");
        let inner = self.inner.clone();
        self.world.scheduler().submit_task_pe(pe, async move {
            let res = std::panic::catch_unwind(AssertUnwindSafe(|| {
                op(&mut inner.partitions[pe].write()[offset])
            }));
            if let Err(payload) = res {
                event.fail(EngineError::WorkerPanic {
                    pe,
                    msg: panic_message(&*payload),
                });
            }
            event.complete(1);
        });
    }
}

impl<T: ElementArithmeticOps> PartitionedArray<T> {
    /// Atomically add `val` to the element at `index` without waiting for the owner.
    ///
    /// Increments are applied by the owning partition under its exclusive lock, so
    /// concurrent increments from any number of PEs are never lost. Visibility follows
    /// [PartitionedArray::write_async].
    pub fn add(&self, index: usize, val: T) {
        self.delegate(index, move |elem| *elem += val);
    }

    /// Atomically add `val` to the element at `index`, returning the previous value.
    pub fn fetch_add(&self, index: usize, val: T) -> T {
        let (pe, offset) = self.locate(index);
        tracing::trace!(id = self.inner.id, index, pe, "fetch_add");
        let mut partition = self.inner.partitions[pe].write();
        let prev = partition[offset];
        partition[offset] += val;
        prev
    }
}
