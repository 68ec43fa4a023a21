// Group and shard views, plus per-operation options.

use crate::runtime::{PublishedPort, UnitConfig, UnitStatus};
use crate::topology::Layout;

/// Options for [`GroupManager::exec`](super::GroupManager::exec).
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub image: String,
    pub layout: Layout,
    /// Port publication specs, applied to every shard.
    pub ports: Vec<String>,
    /// Base configuration merged under the injected fields.
    pub config: Option<UnitConfig>,
}

/// Options for [`GroupManager::stop`](super::GroupManager::stop).
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOptions {
    /// Remove the units (and their anonymous volumes) after stopping them.
    pub purge: bool,
}

/// Runtime group status, rebuilt from labels on every listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub image: String,
    pub shards: Vec<Shard>,
}

/// Runtime group member status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub name: String,
    pub id: String,
    pub status: UnitStatus,
    pub status_text: String,
    /// Affinity descriptor from the shard label.
    pub cpus: String,
    pub ports: Vec<PublishedPort>,
}

impl Shard {
    /// First 12 characters of the runtime id.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}
