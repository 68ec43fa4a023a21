//! Scenario tests: topology, group manager and binder wired together over
//! the in-memory runtime.


pub mod support;
