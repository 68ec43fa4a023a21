use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cpuset::CpuSet;
use crate::error::{Error, Result};

/// Level of the compute hierarchy. Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    ProcessingUnit,
    Core,
    Package,
    Machine,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::ProcessingUnit => "pu",
            NodeKind::Core => "core",
            NodeKind::Package => "package",
            NodeKind::Machine => "machine",
        })
    }
}

/// Placement-unit kind at which shards are counted and allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    #[serde(alias = "pu")]
    ProcessingUnit,
    #[default]
    Core,
    #[serde(alias = "socket")]
    Package,
    Machine,
}

impl Granularity {
    pub fn kind(self) -> NodeKind {
        match self {
            Granularity::ProcessingUnit => NodeKind::ProcessingUnit,
            Granularity::Core => NodeKind::Core,
            Granularity::Package => NodeKind::Package,
            Granularity::Machine => NodeKind::Machine,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pu" | "processing-unit" | "thread" => Ok(Granularity::ProcessingUnit),
            "core" => Ok(Granularity::Core),
            "package" | "socket" => Ok(Granularity::Package),
            "machine" => Ok(Granularity::Machine),
            other => Err(Error::config(format!("unknown granularity {:?}", other))),
        }
    }
}

/// One node of the compute hierarchy.
///
/// Children are kept sorted by physical identifier and a node's cpuset is always
/// the union of its children's, so the canonical depth-first order and the
/// machine cpuset fall out of construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    kind: NodeKind,
    id: u32,
    children: Vec<HierarchyNode>,
    cpuset: CpuSet,
}

impl HierarchyNode {
    pub fn processing_unit(id: u32) -> Self {
        Self {
            kind: NodeKind::ProcessingUnit,
            id,
            children: Vec::new(),
            cpuset: CpuSet::single(id),
        }
    }

    pub fn with_children(kind: NodeKind, id: u32, mut children: Vec<HierarchyNode>) -> Self {
        children.sort_by_key(|c| (c.id, c.cpuset.first()));

        let mut cpuset = CpuSet::new();
        for child in &children {
            cpuset.union_with(&child.cpuset);
        }

        Self {
            kind,
            id,
            children,
            cpuset,
        }
    }

    pub fn core(id: u32, pus: &[u32]) -> Self {
        Self::with_children(
            NodeKind::Core,
            id,
            pus.iter().copied().map(Self::processing_unit).collect(),
        )
    }

    pub fn package(id: u32, cores: Vec<HierarchyNode>) -> Self {
        Self::with_children(NodeKind::Package, id, cores)
    }

    pub fn machine(packages: Vec<HierarchyNode>) -> Self {
        Self::with_children(NodeKind::Machine, 0, packages)
    }

    /// Builds a uniform machine. Hyperthread siblings are numbered the way Linux
    /// does it: thread `t` of global core `c` gets id `t * total_cores + c`.
    pub fn symmetric(packages: u32, cores_per_package: u32, threads_per_core: u32) -> Self {
        let total_cores = packages * cores_per_package;
        let packages = (0..packages)
            .map(|p| {
                let cores = (0..cores_per_package)
                    .map(|c| {
                        let global = p * cores_per_package + c;
                        let pus: Vec<u32> = (0..threads_per_core)
                            .map(|t| t * total_cores + global)
                            .collect();
                        Self::core(c, &pus)
                    })
                    .collect();
                Self::package(p, cores)
            })
            .collect();
        Self::machine(packages)
    }

    /// Single package, one core per processing unit.
    pub fn flat(pus: u32) -> Self {
        let cores = (0..pus).map(|id| Self::core(id, &[id])).collect();
        Self::machine(vec![Self::package(0, cores)])
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn children(&self) -> &[HierarchyNode] {
        &self.children
    }

    pub fn cpuset(&self) -> &CpuSet {
        &self.cpuset
    }

    /// Checks the structural invariants of the snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.kind == NodeKind::ProcessingUnit {
            if !self.children.is_empty() {
                return Err(Error::Topology(format!(
                    "processing unit {} has children",
                    self.id
                )));
            }
            if self.cpuset != CpuSet::single(self.id) {
                return Err(Error::Topology(format!(
                    "processing unit {} covers {}",
                    self.id, self.cpuset
                )));
            }
            return Ok(());
        }

        let mut union = CpuSet::new();
        for (i, child) in self.children.iter().enumerate() {
            if child.kind >= self.kind {
                return Err(Error::Topology(format!(
                    "{} {} nested under {} {}",
                    child.kind, child.id, self.kind, self.id
                )));
            }
            for sibling in &self.children[i + 1..] {
                if !child.cpuset.is_disjoint(&sibling.cpuset) {
                    return Err(Error::Topology(format!(
                        "{} {} ({}) overlaps {} {} ({})",
                        child.kind, child.id, child.cpuset, sibling.kind, sibling.id, sibling.cpuset
                    )));
                }
            }
            child.validate()?;
            union.union_with(&child.cpuset);
        }

        if union != self.cpuset {
            return Err(Error::Topology(format!(
                "{} {} covers {} but its children cover {}",
                self.kind, self.id, self.cpuset, union
            )));
        }

        Ok(())
    }

    /// Placement units below this node, depth-first in physical order.
    /// A subtree with no node of the requested kind contributes its finer
    /// nodes individually.
    pub fn units(&self, granularity: Granularity) -> Vec<&HierarchyNode> {
        let mut out = Vec::new();
        self.collect_units(granularity.kind(), &mut out);
        out
    }

    fn collect_units<'a>(&'a self, kind: NodeKind, out: &mut Vec<&'a HierarchyNode>) {
        if self.kind <= kind || self.children.is_empty() {
            if !self.cpuset.is_empty() {
                out.push(self);
            }
            return;
        }
        for child in &self.children {
            child.collect_units(kind, out);
        }
    }
}
