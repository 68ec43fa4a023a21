// Package runtime provides the RuntimeClient trait.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::ports::{PortMap, Protocol};
use super::unit_config::UnitConfig;
use crate::error::RuntimeError;

/// Lifecycle status of a runtime unit as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Stopped,
    Dead,
    Unknown,
}

impl UnitStatus {
    /// Maps Docker's container state strings.
    pub fn from_state(state: &str) -> Self {
        match state {
            "created" => UnitStatus::Created,
            "running" => UnitStatus::Running,
            "paused" => UnitStatus::Paused,
            "restarting" => UnitStatus::Restarting,
            "removing" => UnitStatus::Removing,
            "exited" | "stopped" => UnitStatus::Stopped,
            "dead" => UnitStatus::Dead,
            _ => UnitStatus::Unknown,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnitStatus::Created => "created",
            UnitStatus::Running => "running",
            UnitStatus::Paused => "paused",
            UnitStatus::Restarting => "restarting",
            UnitStatus::Removing => "removing",
            UnitStatus::Stopped => "stopped",
            UnitStatus::Dead => "dead",
            UnitStatus::Unknown => "unknown",
        })
    }
}

/// A container port published on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishedPort {
    pub ip: Option<String>,
    pub private_port: u16,
    pub public_port: Option<u16>,
    pub protocol: Protocol,
}

/// One entry of a runtime listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub status: UnitStatus,
    /// Human readable status, e.g. "Up 3 minutes".
    pub status_text: String,
    pub labels: HashMap<String, String>,
    pub ports: Vec<PublishedPort>,
}

/// Result of inspecting a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitState {
    pub id: String,
    pub running: bool,
    pub status: UnitStatus,
}

/// Placement-dependent part of a unit's creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    pub cpuset_cpus: String,
    pub port_bindings: PortMap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove anonymous volumes owned by the unit.
    pub remove_volumes: bool,
    pub force: bool,
}

/// RuntimeClient defines the interface for container runtimes.
///
/// Every call is a single round-trip; the caller sequences them.
#[async_trait::async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Creates a unit and returns its runtime identifier.
    async fn create(&self, config: &UnitConfig, host: &HostConfig) -> Result<String, RuntimeError>;

    async fn start(&self, id: &str) -> Result<(), RuntimeError>;

    /// Lists units; stopped ones only when `include_stopped` is set.
    async fn list(&self, include_stopped: bool) -> Result<Vec<Unit>, RuntimeError>;

    async fn inspect(&self, id: &str) -> Result<UnitState, RuntimeError>;

    /// Stops a unit, forcing termination after `grace`.
    async fn stop(&self, id: &str, grace: Duration) -> Result<(), RuntimeError>;

    async fn remove(&self, id: &str, opts: RemoveOptions) -> Result<(), RuntimeError>;
}
