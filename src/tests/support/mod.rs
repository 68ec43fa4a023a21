// Shared test support code: in-memory capabilities with failure injection.

pub mod binder;
pub mod runtime;

pub use binder::RecordingBinder;
pub use runtime::{Call, FakeRuntime};
