//! Volume Reconciler
//!
//! Materializes a deployment unit's volumes as PV/PVC pairs.
//!
//! Reconciliation is forward-only: volumes are processed in request order,
//! the first error aborts the remaining volumes and nothing already created
//! is rolled back. Every create is idempotent on "already exists", so
//! replaying the same request is the recovery path.

use crate::domain::ports::{ClusterVolumeApiRef, CreateOutcome, VolumeDescriptor};
use crate::error::Result;
use crate::metrics::AgentMetrics;
use crate::volume::builder::{ensure_claim_compatible, pv_from_volume, pvc_from_volume};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

const PV_KIND: &str = "PersistentVolume";
const PVC_KIND: &str = "PersistentVolumeClaim";

// =============================================================================
// Report
// =============================================================================

/// What happened to one cluster object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOutcome {
    pub name: String,
    pub outcome: CreateOutcome,
}

/// What happened to one volume descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeOutcome {
    pub volume_id: String,
    /// Absent when the descriptor claims against an external storage class
    pub persistent_volume: Option<ObjectOutcome>,
    pub claim: ObjectOutcome,
}

/// Result of a successful reconciliation, in request order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub volumes: Vec<VolumeOutcome>,
}

impl ReconcileReport {
    /// Claim names, in request order
    pub fn claim_names(&self) -> Vec<String> {
        self.volumes.iter().map(|v| v.claim.name.clone()).collect()
    }

    /// Number of objects this call actually created
    pub fn created_count(&self) -> usize {
        self.volumes
            .iter()
            .map(|v| {
                v.persistent_volume
                    .iter()
                    .chain(std::iter::once(&v.claim))
                    .filter(|o| o.outcome.is_created())
                    .count()
            })
            .sum()
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Creates the PVs and PVCs for a deployment unit's volumes
pub struct VolumeReconciler {
    api: ClusterVolumeApiRef,
    metrics: Option<Arc<AgentMetrics>>,
}

impl VolumeReconciler {
    /// Create a new reconciler over a cluster API
    pub fn new(api: ClusterVolumeApiRef) -> Self {
        Self { api, metrics: None }
    }

    /// Record creates and failures in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<AgentMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reconcile `volumes` in order, stopping at the first error
    pub async fn reconcile(
        &self,
        volumes: &[VolumeDescriptor],
        namespace: &str,
        node_name: &str,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for volume in volumes {
            match self.reconcile_volume(volume, namespace, node_name).await {
                Ok(outcome) => report.volumes.push(outcome),
                Err(e) => {
                    error!(volume_id = %volume.id, "Volume reconciliation failed: {}", e);
                    if let Some(metrics) = &self.metrics {
                        metrics.reconcile_failures.inc();
                    }
                    return Err(e);
                }
            }
        }

        Ok(report)
    }

    async fn reconcile_volume(
        &self,
        volume: &VolumeDescriptor,
        namespace: &str,
        node_name: &str,
    ) -> Result<VolumeOutcome> {
        let mut pv = None;
        let mut pv_outcome = None;
        let mut storage_class = None;

        match volume.external_storage_class() {
            None => {
                let built = pv_from_volume(volume, node_name)?;
                let name = built.metadata.name.clone().unwrap_or_default();
                debug!("Creating persistent volume {}", name);
                let outcome = self.api.create_persistent_volume(&built).await?;
                self.record(PV_KIND, &name, outcome);
                pv_outcome = Some(ObjectOutcome { name, outcome });
                pv = Some(built);
            }
            Some(class_name) => {
                storage_class = Some(self.api.get_storage_class(class_name).await?);
            }
        }

        let pvc = pvc_from_volume(volume, storage_class.as_ref(), namespace)?;
        if let Some(pv) = &pv {
            ensure_claim_compatible(pv, &pvc)?;
        }

        let name = pvc.metadata.name.clone().unwrap_or_default();
        debug!("Creating persistent volume claim {}", name);
        let outcome = self.api.create_persistent_volume_claim(&pvc).await?;
        self.record(PVC_KIND, &name, outcome);

        Ok(VolumeOutcome {
            volume_id: volume.id.clone(),
            persistent_volume: pv_outcome,
            claim: ObjectOutcome { name, outcome },
        })
    }

    fn record(&self, kind: &str, name: &str, outcome: CreateOutcome) {
        match outcome {
            CreateOutcome::Created => {
                info!("Created {} {}", kind, name);
                if let Some(metrics) = &self.metrics {
                    metrics.objects_created.with_label_values(&[kind]).inc();
                }
            }
            CreateOutcome::AlreadyExists => {
                debug!("{} {} already exists", kind, name);
                if let Some(metrics) = &self.metrics {
                    metrics.objects_existing.with_label_values(&[kind]).inc();
                }
            }
        }
    }
}
