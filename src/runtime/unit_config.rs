//! Base unit configuration, shared by all shards of one `exec`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::ports::PortKey;
use crate::error::{Error, Result};

/// Placeholder value of Docker's `{"80/tcp": {}}` maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Empty {}

/// Docker-style container configuration. Unknown keys are ignored, so an
/// existing container config file can be passed as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UnitConfig {
    pub image: String,
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub env: Vec<String>,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub labels: HashMap<String, String>,
    pub exposed_ports: BTreeMap<String, Empty>,
}

impl UnitConfig {
    /// Loads a config file: YAML for `.yaml`/`.yml`, JSON otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("read unit config {}: {}", path.display(), e)))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let cfg = if is_yaml {
            serde_yaml::from_str(&data).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&data).map_err(|e| e.to_string())
        };

        cfg.map_err(|e| Error::config(format!("parse unit config {}: {}", path.display(), e)))
    }

    /// Parsed `ExposedPorts` keys.
    pub fn exposed_port_keys(&self) -> Result<Vec<PortKey>> {
        self.exposed_ports.keys().map(|k| k.parse()).collect()
    }
}
