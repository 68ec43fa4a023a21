//! Sharded container groups: label-derived identity and lifecycle.
//!
//! Nothing is persisted. A group is whatever set of runtime units carries the
//! same `tesson.group` label at the time of the call.

pub mod labels;
pub mod manager;
pub mod model;


// Re-export main types
pub use labels::{GROUP_LABEL, SHARD_LABEL, UNKNOWN_NAME};
pub use manager::{GroupManager, DEFAULT_STOP_GRACE};
pub use model::{ExecOptions, Group, Shard, StopOptions};
