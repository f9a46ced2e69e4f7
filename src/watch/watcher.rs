//! Pod State Watcher
//!
//! Owns the long-lived pod subscription. A `PodWatcher` is the stopped
//! state; `start` consumes it and returns the handle of the running task.
//! There is no way back to stopped short of firing the cancellation token.

use crate::domain::ports::{PodEventHandlerRef, PodEventSource};
use crate::error::{Error, Result};
use crate::watch::cache::PodCache;
use crate::watch::filter::OwnedPodFilter;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Watcher that has not been started yet
pub struct PodWatcher {
    handler: PodEventHandlerRef,
    ownership_label: String,
}

impl PodWatcher {
    /// Watcher feeding owned pods into `cache`
    pub fn new(cache: Arc<PodCache>, ownership_label: impl Into<String>) -> Self {
        let ownership_label = ownership_label.into();
        let handler: PodEventHandlerRef =
            Arc::new(OwnedPodFilter::new(ownership_label.clone(), cache));
        Self {
            handler,
            ownership_label,
        }
    }

    /// Start consuming `source` on a background task
    pub fn start<S>(self, mut source: S) -> WatchHandle
    where
        S: PodEventSource + 'static,
    {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handler = self.handler;

        info!(
            "Starting pod watcher (ownership label {})",
            self.ownership_label
        );

        let task = tokio::spawn(async move {
            let result = source.run(handler, token.clone()).await;
            match &result {
                Ok(()) => info!("Pod watcher stopped"),
                Err(e) => error!("Pod watcher terminated: {}", e),
            }
            // The token doubles as the liveness signal, so fire it on any exit
            token.cancel();
            result
        });

        WatchHandle { shutdown, task }
    }
}

/// Handle to a running watcher
pub struct WatchHandle {
    shutdown: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl WatchHandle {
    /// Token that stops the watcher when cancelled.
    ///
    /// It is also cancelled when the watch task exits on its own.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signal the watcher to stop
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Check if the watch task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the watch task to exit
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("pod watcher task failed: {}", e)))?
    }
}
