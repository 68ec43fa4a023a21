//! Docker Engine implementation of [`RuntimeClient`].

use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerSummary, HostConfig as DockerHostConfig, PortTypeEnum};
use bollard::{Docker, API_DEFAULT_VERSION};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::client::{
    HostConfig, PublishedPort, RemoveOptions, RuntimeClient, Unit, UnitState, UnitStatus,
};
use super::ports::Protocol;
use super::unit_config::UnitConfig;
use crate::error::RuntimeError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Docker daemon client.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to `endpoint` (`unix://...`, `tcp://...`, `http://...`), or to the
    /// local defaults (`DOCKER_HOST` or the default socket) when none is given.
    pub fn connect(endpoint: Option<&str>, timeout: Option<Duration>) -> Result<Self, RuntimeError> {
        let secs = timeout.unwrap_or(DEFAULT_TIMEOUT).as_secs().max(1);

        let docker = match endpoint {
            None => Docker::connect_with_local_defaults(),
            Some(ep) if ep.starts_with("unix://") => {
                Docker::connect_with_socket(ep, secs, API_DEFAULT_VERSION)
            }
            Some(ep) if ep.starts_with("tcp://") => Docker::connect_with_http(
                &ep.replacen("tcp://", "http://", 1),
                secs,
                API_DEFAULT_VERSION,
            ),
            Some(ep) => Docker::connect_with_http(ep, secs, API_DEFAULT_VERSION),
        }
        .map_err(|e| RuntimeError::backend("connect", e))?;

        debug!(
            component = "runtime",
            event = "connected",
            endpoint = endpoint.unwrap_or("local defaults"),
            "docker client configured"
        );

        Ok(Self { docker })
    }

    fn container_config(config: &UnitConfig, host: &HostConfig) -> Config<String> {
        let mut exposed: HashMap<String, HashMap<(), ()>> = config
            .exposed_ports
            .keys()
            .map(|k| (k.clone(), HashMap::new()))
            .collect();

        let mut bindings = HashMap::new();
        for (key, list) in &host.port_bindings {
            exposed.insert(key.to_string(), HashMap::new());
            let list = list
                .iter()
                .map(|b| bollard::models::PortBinding {
                    host_ip: (!b.host_ip.is_empty()).then(|| b.host_ip.clone()),
                    host_port: (!b.host_port.is_empty()).then(|| b.host_port.clone()),
                })
                .collect();
            bindings.insert(key.to_string(), Some(list));
        }

        Config {
            image: Some(config.image.clone()),
            hostname: config.hostname.clone(),
            user: config.user.clone(),
            env: (!config.env.is_empty()).then(|| config.env.clone()),
            cmd: config.cmd.clone(),
            entrypoint: config.entrypoint.clone(),
            working_dir: config.working_dir.clone(),
            labels: Some(config.labels.clone()),
            exposed_ports: (!exposed.is_empty()).then_some(exposed),
            host_config: Some(DockerHostConfig {
                cpuset_cpus: (!host.cpuset_cpus.is_empty()).then(|| host.cpuset_cpus.clone()),
                port_bindings: (!bindings.is_empty()).then_some(bindings),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn unit_from_summary(c: ContainerSummary) -> Unit {
        let ports = c
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|p| PublishedPort {
                ip: p.ip,
                private_port: p.private_port,
                public_port: p.public_port,
                protocol: match p.typ {
                    Some(PortTypeEnum::UDP) => Protocol::Udp,
                    Some(PortTypeEnum::SCTP) => Protocol::Sctp,
                    _ => Protocol::Tcp,
                },
            })
            .collect();

        Unit {
            id: c.id.unwrap_or_default(),
            names: c
                .names
                .unwrap_or_default()
                .into_iter()
                .map(|n| n.trim_start_matches('/').to_string())
                .collect(),
            image: c.image.unwrap_or_default(),
            status: UnitStatus::from_state(c.state.as_deref().unwrap_or_default()),
            status_text: c.status.unwrap_or_default(),
            labels: c.labels.unwrap_or_default(),
            ports,
        }
    }
}

fn map_err(op: &'static str, id: &str, err: DockerError) -> RuntimeError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound(id.to_string()),
        other => RuntimeError::backend(op, other),
    }
}

#[async_trait::async_trait]
impl RuntimeClient for DockerRuntime {
    async fn create(&self, config: &UnitConfig, host: &HostConfig) -> Result<String, RuntimeError> {
        let resp = self
            .docker
            .create_container(
                None::<CreateContainerOptions<String>>,
                Self::container_config(config, host),
            )
            .await
            .map_err(|e| map_err("create", &config.image, e))?;
        Ok(resp.id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_err("start", id, e))
    }

    async fn list(&self, include_stopped: bool) -> Result<Vec<Unit>, RuntimeError> {
        let opts = ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        };
        let list = self
            .docker
            .list_containers(Some(opts))
            .await
            .map_err(|e| RuntimeError::backend("list", e))?;
        Ok(list.into_iter().map(Self::unit_from_summary).collect())
    }

    async fn inspect(&self, id: &str) -> Result<UnitState, RuntimeError> {
        let resp = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_err("inspect", id, e))?;

        let state = resp.state.unwrap_or_default();
        let status = state
            .status
            .map(|s| UnitStatus::from_state(&s.to_string()))
            .unwrap_or(UnitStatus::Unknown);

        Ok(UnitState {
            id: resp.id.unwrap_or_else(|| id.to_string()),
            running: state.running.unwrap_or(false),
            status,
        })
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: grace.as_secs() as i64,
                }),
            )
            .await
            .map_err(|e| map_err("stop", id, e))
    }

    async fn remove(&self, id: &str, opts: RemoveOptions) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    v: opts.remove_volumes,
                    force: opts.force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| map_err("remove", id, e))
    }
}
