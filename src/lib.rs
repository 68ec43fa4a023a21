#[path = "shared/cpuset/mod.rs"]
pub mod cpuset;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod binder;
pub mod cli;
pub mod config;
pub mod error;
pub mod group;
pub mod runtime;
pub mod shutdown;
pub mod topology;
