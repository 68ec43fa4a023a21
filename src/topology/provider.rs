//! Topology capability consumed by the command layer.

use std::path::Path;
use tracing::{debug, info};

use super::hierarchy::{Granularity, HierarchyNode};
use super::placement::{self, Layout, Oversubscription};
use super::sysfs;
use crate::error::Result;

/// Topology defines the interface for placement sources.
pub trait Topology: Send + Sync {
    /// Hierarchy snapshot the placement is computed on.
    fn hierarchy(&self) -> &HierarchyNode;

    /// Number of placement units at the given granularity.
    fn capacity(&self, granularity: Granularity) -> usize;

    /// Computes a layout of `n` descriptors.
    fn distribute(&self, n: usize, granularity: Granularity) -> Result<Layout>;
}

/// Topology of the local host.
#[derive(Debug, Clone)]
pub struct HostTopology {
    root: HierarchyNode,
    policy: Oversubscription,
}

impl HostTopology {
    /// Wraps a hierarchy snapshot, rejecting one that violates its invariants.
    pub fn new(root: HierarchyNode, policy: Oversubscription) -> Result<Self> {
        root.validate()?;
        Ok(Self { root, policy })
    }

    /// Discovers the host hierarchy from sysfs (flat fallback when unavailable).
    pub fn discover(sysfs_root: &Path, policy: Oversubscription) -> Result<Self> {
        let root = sysfs::discover_or_flat(sysfs_root);
        info!(
            component = "topology",
            event = "discovered",
            packages = root.children().len(),
            cores = root.units(Granularity::Core).len(),
            pus = root.cpuset().len(),
            cpuset = %root.cpuset(),
            "host topology loaded"
        );
        Self::new(root, policy)
    }

    pub fn policy(&self) -> Oversubscription {
        self.policy
    }
}

impl Topology for HostTopology {
    fn hierarchy(&self) -> &HierarchyNode {
        &self.root
    }

    fn capacity(&self, granularity: Granularity) -> usize {
        placement::capacity(&self.root, granularity)
    }

    fn distribute(&self, n: usize, granularity: Granularity) -> Result<Layout> {
        let layout = placement::distribute(&self.root, n, granularity, self.policy)?;
        debug!(
            component = "topology",
            event = "layout_computed",
            shards = n,
            granularity = %granularity,
            layout = %layout,
            "placement computed"
        );
        Ok(layout)
    }
}
