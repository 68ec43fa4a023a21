//! Hierarchy discovery from the Linux cpu sysfs tree.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use super::hierarchy::HierarchyNode;
use crate::cpuset::CpuSet;
use crate::error::{Error, Result};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Reads `online` and each cpu's `topology/{physical_package_id,core_id}`.
pub fn discover(root: &Path) -> Result<HierarchyNode> {
    let online = read_trimmed(&root.join("online"))?;
    let online = CpuSet::parse(&online)
        .map_err(|e| Error::Topology(format!("{}: {}", root.join("online").display(), e)))?;

    if online.is_empty() {
        return Err(Error::Topology(format!(
            "{}: no online cpus",
            root.display()
        )));
    }

    // package -> (core id, unknown core) -> processing units
    let mut packages: BTreeMap<u32, BTreeMap<(u32, bool), Vec<u32>>> = BTreeMap::new();

    for cpu in online.iter() {
        let topo = root.join(format!("cpu{}", cpu)).join("topology");
        // Unknown packages collapse into 0.
        let package = read_id(&topo.join("physical_package_id"))?.unwrap_or(0);
        // A PU with an unknown core is a core of its own.
        let core = match read_id(&topo.join("core_id"))? {
            Some(id) => (id, false),
            None => (cpu, true),
        };
        packages
            .entry(package)
            .or_default()
            .entry(core)
            .or_default()
            .push(cpu);
    }

    let packages = packages
        .into_iter()
        .map(|(package, cores)| {
            let cores = cores
                .into_iter()
                .map(|((core, _), pus)| HierarchyNode::core(core, &pus))
                .collect();
            HierarchyNode::package(package, cores)
        })
        .collect();

    Ok(HierarchyNode::machine(packages))
}

/// Like [`discover`], but degrades to a flat hierarchy sized by `num_cpus`.
pub fn discover_or_flat(root: &Path) -> HierarchyNode {
    match discover(root) {
        Ok(node) => node,
        Err(e) => {
            let n = num_cpus::get() as u32;
            warn!(
                component = "topology",
                event = "sysfs_unavailable",
                error = %e,
                num_cpus = n,
                "falling back to flat topology"
            );
            HierarchyNode::flat(n)
        }
    }
}

fn read_trimmed(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| Error::Topology(format!("read {}: {}", path.display(), e)))
}

/// Some platforms report -1 for an unknown id; that reads as `None`.
fn read_id(path: &Path) -> Result<Option<u32>> {
    let raw = read_trimmed(path)?;
    let id: i64 = raw
        .parse()
        .map_err(|_| Error::Topology(format!("{}: invalid id {:?}", path.display(), raw)))?;
    Ok(u32::try_from(id).ok())
}
