//! Label schema shared with the runtime. These keys are the sole source of group membership.

pub const GROUP_LABEL: &str = "tesson.group";
pub const SHARD_LABEL: &str = "tesson.shard";

/// Display name used for units the runtime reports without a name.
pub const UNKNOWN_NAME: &str = "<unknown>";
