//! Block-distributed arrays.
//!
//! A [PartitionedArray] is a fixed-size sequence of elements that every PE can address by
//! global index. It is physically split into one contiguous partition per PE (see
//! [BlockDistribution]); each partition is owned by exactly one PE, which serializes every
//! write to it.
//!
//! # Examples
//!```
//! use strata::{PartitionedArray, WorldBuilder};
//!
//! let world = WorldBuilder::new().with_num_pes(4).build();
//! let array = PartitionedArray::<usize>::new(&world, 10); // pes 0..3 own 2 elements, pe 3 owns 4
//! array.for_each_mut(|i, elem| *elem = i * 2)?;
//! assert_eq!(18, array.read(9));
//!```
use crate::distribution::BlockDistribution;
use crate::World;

use crossbeam::utils::CachePadded;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) mod iteration;
pub(crate) mod operations;
pub mod prelude;

static ARRAY_ID: AtomicUsize = AtomicUsize::new(0);

/// Element types that can be stored in a [PartitionedArray]
pub trait Dist: Copy + Send + Sync + std::fmt::Debug + 'static {}
impl<T> Dist for T where T: Copy + Send + Sync + std::fmt::Debug + 'static {}

/// Element types supporting atomic increments ([PartitionedArray::add], [PartitionedArray::fetch_add])
pub trait ElementArithmeticOps: std::ops::AddAssign + Dist {}
impl<T> ElementArithmeticOps for T where T: std::ops::AddAssign + Dist {}

pub(crate) struct ArrayInner<T: Dist> {
    pub(crate) id: usize,
    pub(crate) partitions: Vec<CachePadded<RwLock<Vec<T>>>>,
    pub(crate) distribution: BlockDistribution,
}

impl<T: Dist> Drop for ArrayInner<T> {
    fn drop(&mut self) {
        tracing::debug!(id = self.id, len = self.distribution.len(), "releasing array");
    }
}

/// A fixed-size array distributed across all PEs of a [World].
///
/// Cloning produces another handle to the same data.
#[derive(Clone)]
pub struct PartitionedArray<T: Dist> {
    pub(crate) inner: Arc<ArrayInner<T>>,
    pub(crate) world: World,
}

impl<T: Dist> std::fmt::Debug for PartitionedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedArray")
            .field("id", &self.inner.id)
            .field("distribution", &self.inner.distribution)
            .finish()
    }
}

impl<T: Dist + Default> PartitionedArray<T> {
    /// Allocate an array of `array_size` default-initialized elements
    pub fn new(world: &World, array_size: usize) -> PartitionedArray<T> {
        PartitionedArray::new_with(world, array_size, T::default())
    }
}

impl<T: Dist> PartitionedArray<T> {
    /// Allocate an array of `array_size` elements, each initialized to `init`
    pub fn new_with(world: &World, array_size: usize, init: T) -> PartitionedArray<T> {
        let distribution = BlockDistribution::new(array_size, world.num_pes());
        let partitions = (0..world.num_pes())
            .map(|pe| CachePadded::new(RwLock::new(vec![init; distribution.num_elems_on_pe(pe)])))
            .collect();
        let id = ARRAY_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id, array_size, num_pes = world.num_pes(), "allocated array");
        PartitionedArray {
            inner: Arc::new(ArrayInner {
                id,
                partitions,
                distribution,
            }),
            world: world.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.distribution.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.distribution.is_empty()
    }

    pub fn num_pes(&self) -> usize {
        self.inner.distribution.num_pes()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn distribution(&self) -> BlockDistribution {
        self.inner.distribution
    }

    /// The PE owning `index`, panics if `index` is out of bounds
    pub fn owner(&self, index: usize) -> usize {
        self.locate(index).0
    }

    /// The global indices owned by `pe`
    pub fn local_range(&self, pe: usize) -> std::ops::Range<usize> {
        self.inner.distribution.local_range(pe)
    }

    pub(crate) fn locate(&self, index: usize) -> (usize, usize) {
        match self.inner.distribution.pe_and_offset(index) {
            Some(loc) => loc,
            None => panic!("index out of bounds {:?} len {:?}", index, self.len()),
        }
    }
}
