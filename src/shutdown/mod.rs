// Package shutdown provides the cancellation scope of one command.

use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels its token on SIGINT or once the deadline elapses, whichever
/// comes first. Dropping the scope stops watching.
pub struct CancelScope {
    token: CancellationToken,
    watcher: JoinHandle<()>,
}

impl CancelScope {
    /// Starts watching. Must be called inside a tokio runtime.
    pub fn new(deadline: Option<Duration>) -> Self {
        Self::with_token(CancellationToken::new(), deadline)
    }

    pub fn with_token(token: CancellationToken, deadline: Option<Duration>) -> Self {
        let watched = token.clone();
        let watcher = tokio::spawn(async move { watch(watched, deadline).await });
        Self { token, watcher }
    }

    /// Token to hand to every component of the command.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

async fn watch(token: CancellationToken, deadline: Option<Duration>) {
    let limit = deadline
        .map(|d| humantime::format_duration(d).to_string())
        .unwrap_or_default();
    let expired = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = token.cancelled() => return,
        res = signal::ctrl_c() => {
            if let Err(err) = res {
                warn!(
                    component = "shutdown",
                    event = "signal_error",
                    error = %err,
                    "cannot listen for SIGINT"
                );
                return;
            }
            info!(
                component = "shutdown",
                event = "os_signal",
                signal = "SIGINT",
                "cancellation started"
            );
        }
        _ = expired => {
            warn!(
                component = "shutdown",
                event = "deadline_exceeded",
                deadline = %limit,
                "cancellation started"
            );
        }
    }

    token.cancel();
}
