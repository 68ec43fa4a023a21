//! Error taxonomy shared by placement, lifecycle and the adapters.

use crate::topology::Granularity;

/// Failure reported by a runtime capability (create, start, list, inspect, stop or remove).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("{op} failed: {source}")]
    Backend {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("unit {0} not found")]
    NotFound(String),
    #[error("runtime call cancelled")]
    Cancelled,
}

impl RuntimeError {
    pub fn backend<E>(op: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RuntimeError::Backend {
            op,
            source: Box::new(err),
        }
    }
}

/// Failure reported by a service binder.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("invalid service binder uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("{method} {path} timed out after {timeout:?}")]
    Timeout {
        method: String,
        path: String,
        timeout: std::time::Duration,
    },
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed unit configuration or port specification. Raised before any mutation.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("insufficient capacity: requested {requested} {granularity} units, {available} available")]
    InsufficientCapacity {
        requested: usize,
        available: usize,
        granularity: Granularity,
    },
    #[error("the specified group does not exist: {0}")]
    GroupDoesNotExist(String),
    #[error("topology: {0}")]
    Topology(String),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("service binding: {0}")]
    ServiceBinding(#[from] BindingError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Runtime(RuntimeError::Cancelled))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
