//! Round-robin, package-first shard placement.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::hierarchy::{Granularity, HierarchyNode};
use crate::cpuset::CpuSet;
use crate::error::{Error, Result};

/// What to do when more shards are requested than there are placement units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Oversubscription {
    /// Fail with `InsufficientCapacity`.
    #[default]
    Deny,
    /// Keep cycling through the placement order; descriptors repeat.
    Share,
}

/// Ordered affinity descriptors, one per shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    descriptors: Vec<String>,
}

impl Layout {
    pub fn new(descriptors: Vec<String>) -> Self {
        Self { descriptors }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.descriptors
    }
}

impl From<Vec<String>> for Layout {
    fn from(descriptors: Vec<String>) -> Self {
        Self::new(descriptors)
    }
}

impl From<Vec<&str>> for Layout {
    fn from(descriptors: Vec<&str>) -> Self {
        Self::new(descriptors.into_iter().map(str::to_string).collect())
    }
}

impl FromIterator<String> for Layout {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptors.join(", "))
    }
}

/// Number of placement units available at the given granularity.
pub fn capacity(root: &HierarchyNode, granularity: Granularity) -> usize {
    root.units(granularity).len()
}

/// Computes one cpuset descriptor per shard.
///
/// Units are taken round-robin across the root's children (packages) so that
/// small groups land on as many packages as possible before any package is
/// packed. Identical inputs always produce the identical layout.
pub fn distribute(
    root: &HierarchyNode,
    n: usize,
    granularity: Granularity,
    policy: Oversubscription,
) -> Result<Layout> {
    if n == 0 {
        return Ok(Layout::default());
    }

    let order = placement_order(root, granularity);
    let available = order.len();

    if available == 0 || (n > available && policy == Oversubscription::Deny) {
        return Err(Error::InsufficientCapacity {
            requested: n,
            available,
            granularity,
        });
    }

    Ok(order
        .iter()
        .cycle()
        .take(n)
        .map(CpuSet::to_string)
        .collect())
}

/// All placement units, interleaved across top-level siblings.
fn placement_order(root: &HierarchyNode, granularity: Granularity) -> Vec<CpuSet> {
    let tops: Vec<&HierarchyNode> =
        if root.kind() <= granularity.kind() || root.children().is_empty() {
            vec![root]
        } else {
            root.children().iter().collect()
        };

    let buckets: Vec<Vec<&HierarchyNode>> = tops
        .into_iter()
        .map(|top| top.units(granularity))
        .filter(|units| !units.is_empty())
        .collect();

    let rounds = buckets.iter().map(Vec::len).max().unwrap_or(0);
    let mut order = Vec::with_capacity(buckets.iter().map(Vec::len).sum());

    for round in 0..rounds {
        for bucket in &buckets {
            if let Some(unit) = bucket.get(round) {
                order.push(unit.cpuset().clone());
            }
        }
    }

    order
}
