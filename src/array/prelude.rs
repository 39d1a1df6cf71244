pub use crate::array::{Dist, ElementArithmeticOps, PartitionedArray};
pub use crate::completion::CompletionEvent;
pub use crate::distribution::BlockDistribution;
pub use crate::domain::{Domain, Edge, Range, Subdomain};
pub use crate::error::{EngineError, EngineResult};
pub use crate::scheduler::{current_pe, EngineTask};
pub use crate::world::{World, WorldBuilder};
