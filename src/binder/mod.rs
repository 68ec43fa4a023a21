//! External load-balancer registration of group shards.

pub mod binder;
pub mod client;
pub mod gorb;


// Re-export main types
pub use binder::ServiceBinder;
pub use gorb::{GorbBinder, GorbOptions};
