//! Detection: the model capability, the invoker that guards it, and the
//! partitioner that turns one pass into the three displayed views.

mod backend;
pub mod backends;
pub mod invoker;
pub mod partition;
pub mod result;

pub use backend::DetectionModel;
pub use backends::ReplayModel;
pub use invoker::{Detected, DetectionInvoker, DetectionTicket};
pub use partition::{partition, partition_with, Partition, Selection, ViewKind, ViewPolicy, VIEW_POLICIES};
pub use result::{BoundingBox, Detection, DetectionSet};
