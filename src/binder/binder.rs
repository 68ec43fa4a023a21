// Package binder provides the ServiceBinder trait.

use crate::error::BindingError;
use crate::group::Shard;

/// ServiceBinder defines the interface for load-balancer control planes.
#[async_trait::async_trait]
pub trait ServiceBinder: Send + Sync {
    /// Registers the group's shards as backends of the group's services.
    async fn create_service(&self, group: &str, shards: &[Shard]) -> Result<(), BindingError>;

    /// Drops the group's services together with their backends.
    async fn remove_service(&self, group: &str, shards: &[Shard]) -> Result<(), BindingError>;
}
