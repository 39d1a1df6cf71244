//! Strata is a small partitioned global address space (PGAS) execution engine.
//!
//! A logically global array is split into fixed-size partitions, one per worker ("PE",
//! processing element). Workers compute over the partition they own while occasionally reading
//! or writing elements owned by other partitions through a uniform remote access interface;
//! every bulk iteration ends with a synchronization point before the next one may start.
//!
//! The engine runs in-process: a [World] owns a fixed pool of worker threads, one per PE, each
//! draining its own FIFO task queue. Two algorithms are built on top of it, [kmeans] clustering
//! and Conway's Game of [life].
//!
//! EXAMPLES
//! --------
//!
//! # Constructing a world
//! ```
//! let world = strata::WorldBuilder::new()
//!     .with_num_pes(4) // defaults to STRATA_NUM_PES, or the available parallelism
//!     .build();
//! ```
//!
//! # Parallel iteration with remote increments
//! ```
//! use strata::array::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let world = WorldBuilder::new().build();
//!     let histogram = PartitionedArray::<usize>::new(&world, 10);
//!     let h = histogram.clone();
//!     world.forall(0..1000, move |i| h.add(i % 10, 1))?; // atomic on the owning pe
//!     assert_eq!(vec![100; 10], histogram.to_vec());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//! Runtime defaults are read once from `STRATA_` prefixed environment variables, see [Config].
pub mod array;
pub use array::prelude::*;
mod barrier;
mod completion;
mod distribution;
pub mod domain;
mod env_var;
mod error;
mod forall;
pub mod kmeans;
pub mod life;
mod scheduler;
mod warnings;
mod world;

pub use crate::env_var::{config, Config};
