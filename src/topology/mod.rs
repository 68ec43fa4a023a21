//! Host compute hierarchy and topology-aware shard placement.
//!
//! The hierarchy is a snapshot of machine -> package -> core -> processing unit,
//! either discovered from sysfs or built by hand. Placement turns "N shards at
//! granularity G" into N cpuset descriptors, spreading across packages first.

pub mod hierarchy;
pub mod placement;
pub mod provider;
pub mod sysfs;


// Re-export main types
pub use hierarchy::{Granularity, HierarchyNode, NodeKind};
pub use placement::{capacity, distribute, Layout, Oversubscription};
pub use provider::{HostTopology, Topology};
pub use sysfs::DEFAULT_SYSFS_ROOT;
