//! Pod Cache
//!
//! Authoritative in-memory view of the agent's pods, fed by the watcher and
//! read by status reporting. A single lock covers the whole map and is
//! never held across I/O; readers always get owned copies.

use crate::domain::ports::{ContainerStatusSummary, PodEventHandler, PodStatusSummary};
use crate::metrics::AgentMetrics;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Pod Record
// =============================================================================

/// Snapshot of a pod as last observed
#[derive(Debug, Clone)]
pub struct PodRecord {
    /// Full pod object
    pub pod: Pod,
    /// When the event carrying this state was applied
    pub observed_at: DateTime<Utc>,
}

impl PodRecord {
    pub fn new(pod: Pod) -> Self {
        Self {
            pod,
            observed_at: Utc::now(),
        }
    }

    pub fn name(&self) -> String {
        self.pod.name_any()
    }

    /// Pod phase, e.g. `Running`
    pub fn phase(&self) -> Option<&str> {
        self.pod.status.as_ref()?.phase.as_deref()
    }

    /// Condensed status for reporting to the origin
    pub fn summary(&self) -> PodStatusSummary {
        let status = self.pod.status.as_ref();
        let containers = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| {
                statuses
                    .iter()
                    .map(|c| ContainerStatusSummary {
                        name: c.name.clone(),
                        ready: c.ready,
                        restart_count: c.restart_count,
                        container_id: c.container_id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        PodStatusSummary {
            name: self.name(),
            phase: self.phase().map(str::to_string),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            host_ip: status.and_then(|s| s.host_ip.clone()),
            node_name: self.pod.spec.as_ref().and_then(|s| s.node_name.clone()),
            containers,
            observed_at: self.observed_at,
        }
    }
}

// =============================================================================
// Pod Cache
// =============================================================================

/// Concurrent map of owned pods keyed by name
#[derive(Default)]
pub struct PodCache {
    pods: Mutex<HashMap<String, PodRecord>>,
    metrics: Option<Arc<AgentMetrics>>,
}

impl std::fmt::Debug for PodCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodCache")
            .field("pod_count", &self.len())
            .finish()
    }
}

impl PodCache {
    /// Create an empty cache
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create an empty cache that reports its size and events to `metrics`
    pub fn with_metrics(metrics: Arc<AgentMetrics>) -> Arc<Self> {
        Arc::new(Self {
            pods: Mutex::new(HashMap::new()),
            metrics: Some(metrics),
        })
    }

    /// Insert or replace the record for a pod
    pub fn upsert(&self, pod: Pod) {
        let name = pod.name_any();
        let size = {
            let mut pods = self.pods.lock();
            pods.insert(name, PodRecord::new(pod));
            pods.len()
        };
        self.set_size(size);
    }

    /// Remove the record for `name`, returning it if present
    pub fn remove(&self, name: &str) -> Option<PodRecord> {
        let (removed, size) = {
            let mut pods = self.pods.lock();
            let removed = pods.remove(name);
            (removed, pods.len())
        };
        self.set_size(size);
        removed
    }

    /// Copy of the record for `name`
    pub fn get(&self, name: &str) -> Option<PodRecord> {
        self.pods.lock().get(name).cloned()
    }

    /// Check if a pod is cached
    pub fn contains(&self, name: &str) -> bool {
        self.pods.lock().contains_key(name)
    }

    /// Copies of all records, sorted by name
    pub fn list(&self) -> Vec<PodRecord> {
        let mut records: Vec<PodRecord> = self.pods.lock().values().cloned().collect();
        records.sort_by_key(|r| r.name());
        records
    }

    /// Number of cached pods
    pub fn len(&self) -> usize {
        self.pods.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set_size(&self, size: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.pod_cache_size.set(size as i64);
        }
    }

    fn count_event(&self, event: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.pod_events.with_label_values(&[event]).inc();
        }
    }
}

impl PodEventHandler for PodCache {
    fn on_add(&self, pod: &Pod) {
        debug!("Pod added: {}", pod.name_any());
        self.count_event("add");
        self.upsert(pod.clone());
    }

    fn on_update(&self, _old: &Pod, new: &Pod) {
        debug!("Pod updated: {}", new.name_any());
        self.count_event("update");
        self.upsert(new.clone());
    }

    fn on_delete(&self, pod: &Pod) {
        debug!("Pod deleted: {}", pod.name_any());
        self.count_event("delete");
        self.remove(&pod.name_any());
    }
}
