// In-memory RuntimeClient that behaves like a single-host container daemon.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::runtime::{
    HostConfig, PublishedPort, RemoveOptions, RuntimeClient, Unit, UnitConfig, UnitState,
    UnitStatus,
};

/// Mutating and inspecting calls, in the order they were issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { cpuset: String },
    Start(String),
    List,
    Inspect(String),
    Stop { id: String, grace: Duration },
    Remove { id: String, volumes: bool },
}

#[derive(Debug, Clone)]
pub struct FakeUnit {
    pub unit: Unit,
    pub config: UnitConfig,
    pub host: HostConfig,
}

#[derive(Default)]
struct Inner {
    units: Vec<FakeUnit>,
    calls: Vec<Call>,
    next_id: u64,
    fail_create_at: Option<usize>,
    fail_start_at: Option<usize>,
    fail_stop_of: Option<String>,
    cancel_after_creates: Option<(usize, CancellationToken)>,
    creates: usize,
    starts: usize,
}

#[derive(Default)]
pub struct FakeRuntime {
    inner: Mutex<Inner>,
}

fn failure(op: &'static str) -> RuntimeError {
    RuntimeError::backend(
        op,
        std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
    )
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit created outside of tesson.
    pub fn seed(&self, names: &[&str], image: &str, status: UnitStatus, labels: &[(&str, &str)]) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = Self::allocate_id(&mut inner);
        inner.units.push(FakeUnit {
            unit: Unit {
                id: id.clone(),
                names: names.iter().map(|n| n.to_string()).collect(),
                image: image.to_string(),
                status,
                status_text: status.to_string(),
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ports: Vec::new(),
            },
            config: UnitConfig::default(),
            host: HostConfig::default(),
        });
        id
    }

    /// Fails the n-th (0-based) create call.
    pub fn fail_create_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_create_at = Some(n);
    }

    /// Fails the n-th (0-based) start call.
    pub fn fail_start_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_start_at = Some(n);
    }

    pub fn fail_stop_of(&self, id: &str) {
        self.inner.lock().unwrap().fail_stop_of = Some(id.to_string());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_create_at = None;
        inner.fail_start_at = None;
        inner.fail_stop_of = None;
    }

    /// Cancels `token` right after the n-th successful create.
    pub fn cancel_after_creates(&self, n: usize, token: CancellationToken) {
        self.inner.lock().unwrap().cancel_after_creates = Some((n, token));
    }

    /// Adds a published port to a unit, as the runtime reports once it is running.
    pub fn publish(&self, id: &str, port: PublishedPort) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(u) = inner.units.iter_mut().find(|u| u.unit.id == id) {
            u.unit.ports.push(port);
        }
    }

    pub fn set_status(&self, id: &str, status: UnitStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(u) = inner.units.iter_mut().find(|u| u.unit.id == id) {
            u.unit.status = status;
            u.unit.status_text = status.to_string();
        }
    }

    pub fn units(&self) -> Vec<FakeUnit> {
        self.inner.lock().unwrap().units.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls that change runtime state.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List | Call::Inspect(_)))
            .collect()
    }

    fn allocate_id(inner: &mut Inner) -> String {
        inner.next_id += 1;
        format!("{:016x}{:048x}", inner.next_id, 0xc0ffee_u64)
    }
}

#[async_trait::async_trait]
impl RuntimeClient for FakeRuntime {
    async fn create(&self, config: &UnitConfig, host: &HostConfig) -> Result<String, RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Create {
            cpuset: host.cpuset_cpus.clone(),
        });

        let n = inner.creates;
        inner.creates += 1;
        if inner.fail_create_at == Some(n) {
            return Err(failure("create"));
        }

        let id = Self::allocate_id(&mut inner);
        let name = format!("{}-{}", config.image.replace(['/', ':'], "-"), inner.next_id);
        inner.units.push(FakeUnit {
            unit: Unit {
                id: id.clone(),
                names: vec![name],
                image: config.image.clone(),
                status: UnitStatus::Created,
                status_text: "Created".to_string(),
                labels: config.labels.clone(),
                ports: Vec::new(),
            },
            config: config.clone(),
            host: host.clone(),
        });

        if let Some((after, token)) = &inner.cancel_after_creates {
            if *after == n + 1 {
                token.cancel();
            }
        }

        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Start(id.to_string()));

        let n = inner.starts;
        inner.starts += 1;
        if inner.fail_start_at == Some(n) {
            return Err(failure("start"));
        }

        let unit = inner
            .units
            .iter_mut()
            .find(|u| u.unit.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        unit.unit.status = UnitStatus::Running;
        unit.unit.status_text = "Up Less than a second".to_string();
        Ok(())
    }

    async fn list(&self, include_stopped: bool) -> Result<Vec<Unit>, RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::List);
        Ok(inner
            .units
            .iter()
            .filter(|u| include_stopped || u.unit.status == UnitStatus::Running)
            .map(|u| u.unit.clone())
            .collect())
    }

    async fn inspect(&self, id: &str) -> Result<UnitState, RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Inspect(id.to_string()));
        let unit = inner
            .units
            .iter()
            .find(|u| u.unit.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        Ok(UnitState {
            id: unit.unit.id.clone(),
            running: unit.unit.status == UnitStatus::Running,
            status: unit.unit.status,
        })
    }

    async fn stop(&self, id: &str, grace: Duration) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Stop {
            id: id.to_string(),
            grace,
        });
        if inner.fail_stop_of.as_deref() == Some(id) {
            return Err(failure("stop"));
        }
        let unit = inner
            .units
            .iter_mut()
            .find(|u| u.unit.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        unit.unit.status = UnitStatus::Stopped;
        unit.unit.status_text = "Exited (0) Less than a second ago".to_string();
        unit.unit.ports.clear();
        Ok(())
    }

    async fn remove(&self, id: &str, opts: RemoveOptions) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Remove {
            id: id.to_string(),
            volumes: opts.remove_volumes,
        });
        let before = inner.units.len();
        inner.units.retain(|u| u.unit.id != id);
        if inner.units.len() == before {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
