//! Container runtime capability and its Docker adapter.

pub mod client;
pub mod docker;
pub mod ports;
pub mod unit_config;

#[cfg(test)]
mod ports_test;

// Re-export main types
pub use client::{
    HostConfig, PublishedPort, RemoveOptions, RuntimeClient, Unit, UnitState, UnitStatus,
};
pub use docker::DockerRuntime;
pub use ports::{parse_port_specs, PortBinding, PortKey, PortMap, Protocol};
pub use unit_config::UnitConfig;
