//! Agent Metrics
//!
//! Prometheus collectors for volume reconciliation and the pod watcher.

use crate::error::{Error, Result};
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Collectors shared by the reconciler and the pod cache
#[derive(Debug, Clone)]
pub struct AgentMetrics {
    /// Objects created, by kind
    pub objects_created: IntCounterVec,
    /// Create calls that found the object already present, by kind
    pub objects_existing: IntCounterVec,
    /// Reconciliations aborted by an error
    pub reconcile_failures: IntCounter,
    /// Pod events applied to the cache, by event type
    pub pod_events: IntCounterVec,
    /// Pods currently cached
    pub pod_cache_size: IntGauge,
}

impl AgentMetrics {
    /// Create the collectors and register them with `registry`
    pub fn register(registry: &Registry) -> Result<Arc<Self>> {
        let metrics = Self {
            objects_created: IntCounterVec::new(
                Opts::new(
                    "sync_agent_volume_objects_created_total",
                    "Volume objects created in the cluster",
                ),
                &["kind"],
            )
            .map_err(prom_err)?,
            objects_existing: IntCounterVec::new(
                Opts::new(
                    "sync_agent_volume_objects_existing_total",
                    "Volume object creates that found the object already present",
                ),
                &["kind"],
            )
            .map_err(prom_err)?,
            reconcile_failures: IntCounter::new(
                "sync_agent_reconcile_failures_total",
                "Volume reconciliations aborted by an error",
            )
            .map_err(prom_err)?,
            pod_events: IntCounterVec::new(
                Opts::new("sync_agent_pod_events_total", "Owned pod events applied to the cache"),
                &["event"],
            )
            .map_err(prom_err)?,
            pod_cache_size: IntGauge::new("sync_agent_pod_cache_size", "Owned pods in the cache")
                .map_err(prom_err)?,
        };

        registry
            .register(Box::new(metrics.objects_created.clone()))
            .map_err(prom_err)?;
        registry
            .register(Box::new(metrics.objects_existing.clone()))
            .map_err(prom_err)?;
        registry
            .register(Box::new(metrics.reconcile_failures.clone()))
            .map_err(prom_err)?;
        registry
            .register(Box::new(metrics.pod_events.clone()))
            .map_err(prom_err)?;
        registry
            .register(Box::new(metrics.pod_cache_size.clone()))
            .map_err(prom_err)?;

        Ok(Arc::new(metrics))
    }
}

fn prom_err(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics registration failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_gather() {
        let registry = Registry::new();
        let metrics = AgentMetrics::register(&registry).unwrap();

        metrics
            .objects_created
            .with_label_values(&["PersistentVolume"])
            .inc();
        metrics.pod_cache_size.set(3);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"sync_agent_volume_objects_created_total".to_string()));
        assert!(names.contains(&"sync_agent_pod_cache_size".to_string()));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        AgentMetrics::register(&registry).unwrap();
        assert!(AgentMetrics::register(&registry).is_err());
    }
}
