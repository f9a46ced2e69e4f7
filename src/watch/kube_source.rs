//! Kubernetes pod event source
//!
//! List-then-watch over the pods of one namespace. There is no periodic
//! resync; after the initial list the cache is driven by watch events only.
//! Stream errors are retried with exponential backoff.

use crate::domain::ports::{PodEventHandler, PodEventSource};
use crate::error::{Error, Result};
use crate::watch::events::InformerStore;
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pod event source backed by the Kubernetes watch API
pub struct KubePodEventSource {
    api: Api<Pod>,
    namespace: String,
    store: InformerStore,
}

impl KubePodEventSource {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            store: InformerStore::new(),
        }
    }
}

/// Retry policy for the watch stream; never gives up
fn watch_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: None,
        ..Default::default()
    }
}

#[async_trait]
impl PodEventSource for KubePodEventSource {
    async fn run(
        &mut self,
        handler: Arc<dyn PodEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        info!("Watching pods in namespace {}", self.namespace);

        let mut stream = watcher(self.api.clone(), watcher::Config::default())
            .backoff(watch_backoff())
            .boxed();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Pod watch in namespace {} cancelled", self.namespace);
                    return Ok(());
                }
                next = stream.next() => match next {
                    Some(Ok(event)) => {
                        for change in self.store.apply(event) {
                            debug!("Pod {} event for {}", change.kind(), change.pod_name());
                            change.dispatch(handler.as_ref());
                        }
                    }
                    Some(Err(e)) => warn!("Pod watch error in namespace {}: {}", self.namespace, e),
                    None => {
                        return Err(Error::Watch(format!(
                            "pod watch stream for namespace {} ended",
                            self.namespace
                        )));
                    }
                },
            }
        }
    }
}
