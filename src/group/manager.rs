//! Group lifecycle: exec, list, info and stop over a [`RuntimeClient`].
//!
//! Every runtime call is issued one at a time and awaited before the next.
//! Multi-shard operations are not atomic: the first failure is returned and
//! whatever was already created or stopped stays that way. Re-running `stop`
//! converges, since running shards get stopped and stopped ones are skipped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::labels::{GROUP_LABEL, SHARD_LABEL, UNKNOWN_NAME};
use super::model::{ExecOptions, Group, Shard, StopOptions};
use crate::binder::ServiceBinder;
use crate::error::{Error, Result, RuntimeError};
use crate::runtime::{parse_port_specs, HostConfig, RemoveOptions, RuntimeClient, Unit};

/// Time a shard gets to exit after the stop signal before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(30);

pub struct GroupManager {
    runtime: Arc<dyn RuntimeClient>,
    binder: Option<Arc<dyn ServiceBinder>>,
    cancel: CancellationToken,
    stop_grace: Duration,
}

impl GroupManager {
    /// Creates a manager whose calls abort once `cancel` fires.
    pub fn new(runtime: Arc<dyn RuntimeClient>, cancel: CancellationToken) -> Self {
        Self {
            runtime,
            binder: None,
            cancel,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Keeps the binder's services in sync on exec and stop.
    pub fn with_binder(mut self, binder: Arc<dyn ServiceBinder>) -> Self {
        self.binder = Some(binder);
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Races one external call against the cancellation scope.
    async fn call<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RuntimeError::Cancelled.into()),
            res = fut => res.map_err(Into::into),
        }
    }

    /// Creates and starts one unit per layout entry, in layout order.
    pub async fn exec(&self, group: &str, opts: ExecOptions) -> Result<()> {
        if group.is_empty() {
            return Err(Error::config("group name must not be empty"));
        }
        if opts.image.is_empty() {
            return Err(Error::config("image must not be empty"));
        }

        // Everything that can be rejected is checked before the first create.
        let port_bindings = parse_port_specs(&opts.ports)?;
        let mut config = opts.config.unwrap_or_default();
        config.exposed_port_keys()?;

        config.image = opts.image;
        config
            .labels
            .insert(GROUP_LABEL.to_string(), group.to_string());

        for (index, cpus) in opts.layout.iter().enumerate() {
            config
                .labels
                .insert(SHARD_LABEL.to_string(), cpus.to_string());
            let host = HostConfig {
                cpuset_cpus: cpus.to_string(),
                port_bindings: port_bindings.clone(),
            };

            let id = self.call(self.runtime.create(&config, &host)).await?;
            info!(
                component = "group",
                event = "unit_created",
                group = group,
                shard = index,
                cpus = cpus,
                id = %id,
                "instance created"
            );

            self.call(self.runtime.start(&id)).await?;
            debug!(
                component = "group",
                event = "unit_started",
                group = group,
                id = %id,
                "instance started"
            );
        }

        if let Some(binder) = self.binder.as_ref().filter(|_| !opts.layout.is_empty()) {
            let current = self.info(group).await?;
            self.call(binder.create_service(group, &current.shards))
                .await?;
            info!(
                component = "group",
                event = "service_bound",
                group = group,
                shards = current.shards.len(),
                "service registered"
            );
        }

        Ok(())
    }

    /// Rebuilds every group from the labels of all units, stopped ones included.
    /// Groups and shards keep the order in which the runtime listed them.
    pub async fn list(&self) -> Result<Vec<Group>> {
        let units = self.call(self.runtime.list(true)).await?;

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for unit in units {
            let Some(name) = unit.labels.get(GROUP_LABEL).cloned() else {
                continue;
            };

            let slot = match index.get(&name) {
                Some(slot) => *slot,
                None => {
                    groups.push(Group {
                        name: name.clone(),
                        image: unit.image.clone(),
                        shards: Vec::new(),
                    });
                    index.insert(name, groups.len() - 1);
                    groups.len() - 1
                }
            };

            groups[slot].shards.push(shard_from_unit(unit));
        }

        Ok(groups)
    }

    /// Looks up a single group.
    pub async fn info(&self, group: &str) -> Result<Group> {
        self.list()
            .await?
            .into_iter()
            .find(|g| g.name == group)
            .ok_or_else(|| Error::GroupDoesNotExist(group.to_string()))
    }

    /// Stops (and with `purge`, removes) every shard of the group in listing order.
    pub async fn stop(&self, group: &str, opts: StopOptions) -> Result<()> {
        let target = self.info(group).await?;

        if let Some(binder) = &self.binder {
            self.call(binder.remove_service(group, &target.shards))
                .await?;
            info!(
                component = "group",
                event = "service_unbound",
                group = group,
                "service deregistered"
            );
        }

        for shard in &target.shards {
            self.stop_shard(shard, opts).await?;
        }

        info!(
            component = "group",
            event = "group_stopped",
            group = group,
            shards = target.shards.len(),
            purge = opts.purge,
            "group stopped"
        );

        Ok(())
    }

    async fn stop_shard(&self, shard: &Shard, opts: StopOptions) -> Result<()> {
        let state = self.call(self.runtime.inspect(&shard.id)).await?;

        if state.running {
            self.call(self.runtime.stop(&state.id, self.stop_grace))
                .await?;
            info!(
                component = "group",
                event = "unit_stopped",
                id = %state.id,
                "instance stopped"
            );
        }

        if !opts.purge {
            return Ok(());
        }

        self.call(self.runtime.remove(
            &state.id,
            RemoveOptions {
                remove_volumes: true,
                force: false,
            },
        ))
        .await?;
        info!(
            component = "group",
            event = "unit_removed",
            id = %state.id,
            "instance removed"
        );

        Ok(())
    }
}

fn shard_from_unit(unit: Unit) -> Shard {
    let name = unit
        .names
        .iter()
        .find(|n| !n.is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    Shard {
        name,
        cpus: unit.labels.get(SHARD_LABEL).cloned().unwrap_or_default(),
        id: unit.id,
        status: unit.status,
        status_text: unit.status_text,
        ports: unit.ports,
    }
}
