//! Processing-unit sets and their list notation (`0-3,8,10-11`).

pub mod cpuset;


pub use cpuset::{CpuSet, ParseCpuSetError, MAX_CPU_ID};
