// ServiceBinder that records what it was asked to do.

use std::sync::Mutex;

use crate::binder::ServiceBinder;
use crate::error::BindingError;
use crate::group::Shard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinderCall {
    Create { group: String, shards: usize },
    Remove { group: String, shards: usize },
}

#[derive(Default)]
pub struct RecordingBinder {
    calls: Mutex<Vec<BinderCall>>,
    fail: Mutex<bool>,
}

impl RecordingBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let binder = Self::default();
        *binder.fail.lock().unwrap() = true;
        binder
    }

    pub fn calls(&self) -> Vec<BinderCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, method: &str) -> Result<(), BindingError> {
        if *self.fail.lock().unwrap() {
            return Err(BindingError::Status {
                method: method.to_string(),
                path: "service/test".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ServiceBinder for RecordingBinder {
    async fn create_service(&self, group: &str, shards: &[Shard]) -> Result<(), BindingError> {
        self.calls.lock().unwrap().push(BinderCall::Create {
            group: group.to_string(),
            shards: shards.len(),
        });
        self.check("PUT")
    }

    async fn remove_service(&self, group: &str, shards: &[Shard]) -> Result<(), BindingError> {
        self.calls.lock().unwrap().push(BinderCall::Remove {
            group: group.to_string(),
            shards: shards.len(),
        });
        self.check("DELETE")
    }
}
