// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::binder::GorbOptions;
use crate::topology::{Granularity, Oversubscription};

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

/// Lookup order when no explicit file is given.
pub const LOCAL_CONFIG_PATH: &str = "cfg/tesson.cfg.local.yaml";
pub const DEFAULT_CONFIG_PATH: &str = "cfg/tesson.cfg.yaml";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Tesson {
    #[serde(rename = "tesson")]
    pub tesson: TessonBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TessonBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub runtime: Option<Runtime>,
    pub placement: Option<Placement>,
    pub topology: Option<Topology>,
    pub gorb: Option<Gorb>,
}

impl Default for TessonBox {
    fn default() -> Self {
        Self {
            env: DEV.to_string(),
            logs: None,
            runtime: None,
            placement: None,
            topology: None,
            gorb: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Runtime {
    /// `unix://`, `tcp://` or `http://` daemon address; local defaults when absent.
    pub endpoint: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(rename = "stop_grace", default, with = "humantime_serde")]
    pub stop_grace: Option<Duration>,
    /// Upper bound for a whole command.
    #[serde(default, with = "humantime_serde")]
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Placement {
    pub granularity: Option<Granularity>,
    pub oversubscription: Option<Oversubscription>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Topology {
    #[serde(rename = "sysfs_root")]
    pub sysfs_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Gorb {
    pub uri: Option<String>,
    #[serde(flatten)]
    pub options: GorbOptions,
}

// Config trait
pub trait ConfigTrait {
    fn is_prod(&self) -> bool;
    #[allow(dead_code)]
    fn is_test(&self) -> bool;
    fn log_level(&self) -> &str;
    fn endpoint(&self) -> Option<&str>;
    fn timeout(&self) -> Duration;
    fn stop_grace(&self) -> Duration;
    fn deadline(&self) -> Option<Duration>;
    fn granularity(&self) -> Granularity;
    fn oversubscription(&self) -> Oversubscription;
    fn sysfs_root(&self) -> &Path;
    fn gorb_uri(&self) -> Option<&str>;
    fn gorb_options(&self) -> GorbOptions;
}

// Config type alias for convenience
pub type Config = Tesson;

impl ConfigTrait for Config {
    fn is_prod(&self) -> bool {
        self.tesson.env == PROD
    }

    fn is_test(&self) -> bool {
        self.tesson.env == TEST
    }

    fn log_level(&self) -> &str {
        self.tesson
            .logs
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn endpoint(&self) -> Option<&str> {
        self.tesson.runtime.as_ref()?.endpoint.as_deref()
    }

    fn timeout(&self) -> Duration {
        self.tesson
            .runtime
            .as_ref()
            .and_then(|r| r.timeout)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    fn stop_grace(&self) -> Duration {
        self.tesson
            .runtime
            .as_ref()
            .and_then(|r| r.stop_grace)
            .unwrap_or(DEFAULT_STOP_GRACE)
    }

    fn deadline(&self) -> Option<Duration> {
        self.tesson.runtime.as_ref()?.deadline
    }

    fn granularity(&self) -> Granularity {
        self.tesson
            .placement
            .as_ref()
            .and_then(|p| p.granularity)
            .unwrap_or_default()
    }

    fn oversubscription(&self) -> Oversubscription {
        self.tesson
            .placement
            .as_ref()
            .and_then(|p| p.oversubscription)
            .unwrap_or_default()
    }

    fn sysfs_root(&self) -> &Path {
        self.tesson
            .topology
            .as_ref()
            .and_then(|t| t.sysfs_root.as_deref())
            .unwrap_or_else(|| Path::new(crate::topology::DEFAULT_SYSFS_ROOT))
    }

    fn gorb_uri(&self) -> Option<&str> {
        self.tesson
            .gorb
            .as_ref()?
            .uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
    }

    fn gorb_options(&self) -> GorbOptions {
        self.tesson
            .gorb
            .as_ref()
            .map(|g| g.options.clone())
            .unwrap_or_default()
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        // Resolve absolute path
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;
        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;
        let cfg: Tesson = serde_yaml::from_str(&data)
            .with_context(|| format!("unmarshal yaml from {:?}", abs_path))?;
        Ok(cfg)
    }

    /// Loads `custom` when given, else the first existing default path, else
    /// built-in defaults. Returns the path that was used.
    pub fn resolve(custom: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = custom {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        for candidate in [LOCAL_CONFIG_PATH, DEFAULT_CONFIG_PATH] {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok((Self::load(path)?, Some(path.to_path_buf())));
            }
        }
        Ok((Self::default(), None))
    }

    /// `--gorb` / `GORB_URI` take precedence over the file.
    pub fn override_gorb_uri(&mut self, uri: Option<String>) {
        let Some(uri) = uri else { return };
        self.tesson.gorb.get_or_insert_with(Gorb::default).uri = Some(uri);
    }
}

#[cfg(test)]
mod config_test;
