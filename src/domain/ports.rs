//! Domain Ports - Core trait definitions for the sync agent
//!
//! These traits define the boundaries between the reconciliation / watch
//! logic and external systems (the cluster API, the pod event stream and the
//! origin's reply channel). Adapters implement these traits to provide
//! concrete functionality; tests substitute in-memory fakes.

use crate::error::Result;
use crate::gateway::Publish;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim, Pod};
use k8s_openapi::api::storage::v1::StorageClass;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Volume Descriptor
// =============================================================================

/// Abstract description of a volume requested by the origin system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    /// Origin-side identity; the cluster object names are derived from it
    pub id: String,
    /// Human readable name, informational only
    #[serde(default)]
    pub name: String,
    /// Requested size in megabytes, 0 for "no capacity constraint"
    #[serde(default)]
    pub size_mb: u64,
    /// Externally managed storage class to claim against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Backend-specific source document, e.g. `{"nfs": {"server": .., "path": ..}}`
    #[serde(default)]
    pub source_config: serde_json::Value,
}

impl VolumeDescriptor {
    /// External storage class name, treating an empty string as absent
    pub fn external_storage_class(&self) -> Option<&str> {
        self.storage_class.as_deref().filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Deployment Sync Request/Response
// =============================================================================

/// Deployment unit the origin asks the agent to materialize
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSyncRequest {
    /// Deployment unit identity; the unit's pod carries this name
    #[serde(default)]
    pub deployment_unit_uuid: String,
    /// Revision stamped into the ownership label of created pods
    #[serde(default)]
    pub revision: String,
    /// Target namespace
    #[serde(default)]
    pub namespace: String,
    /// Node the unit is scheduled to, may be empty
    #[serde(default)]
    pub node_name: String,
    /// Containers, translated into a pod spec by an external collaborator
    #[serde(default)]
    pub containers: Vec<serde_json::Value>,
    /// Networks, translated into a pod spec by an external collaborator
    #[serde(default)]
    pub networks: Vec<serde_json::Value>,
    /// Volumes to materialize as PV/PVC pairs
    #[serde(default)]
    pub volumes: Vec<VolumeDescriptor>,
}

impl DeploymentSyncRequest {
    /// Name of the pod backing this deployment unit
    pub fn pod_name(&self) -> &str {
        &self.deployment_unit_uuid
    }
}

/// Per-container readiness as seen in the pod cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatusSummary {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

/// Status of a cached pod, as reported back to the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatusSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub containers: Vec<ContainerStatusSummary>,
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

/// Result of a deployment sync, carried in the reply payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSyncResponse {
    pub deployment_unit_uuid: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub node_name: String,
    /// Names of the claims backing the unit's volumes, in request order
    pub volume_claims: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_status: Option<PodStatusSummary>,
}

// =============================================================================
// Cluster Volume API Port
// =============================================================================

/// Outcome of a create call against the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateOutcome {
    /// The object was created by this call
    Created,
    /// An object with the same name already existed; treated as success
    AlreadyExists,
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created)
    }
}

impl std::fmt::Display for CreateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateOutcome::Created => write!(f, "created"),
            CreateOutcome::AlreadyExists => write!(f, "already_exists"),
        }
    }
}

/// Port for the cluster calls the volume reconciler depends on
#[async_trait]
pub trait ClusterVolumeApi: Send + Sync {
    /// Fetch a storage class by name
    async fn get_storage_class(&self, name: &str) -> Result<StorageClass>;

    /// Create a cluster-scoped persistent volume
    async fn create_persistent_volume(&self, pv: &PersistentVolume) -> Result<CreateOutcome>;

    /// Create a claim in the namespace carried on the claim
    async fn create_persistent_volume_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> Result<CreateOutcome>;
}

// =============================================================================
// Pod Event Ports
// =============================================================================

/// Receiver of pod add/update/delete notifications.
///
/// Callbacks are invoked serially by a single event source and must not block.
pub trait PodEventHandler: Send + Sync {
    fn on_add(&self, pod: &Pod);

    fn on_update(&self, old: &Pod, new: &Pod);

    fn on_delete(&self, pod: &Pod);
}

/// Source of pod events, e.g. a list-then-watch stream or a scripted replay
#[async_trait]
pub trait PodEventSource: Send {
    /// Deliver events to `handler` until the source ends or `shutdown` fires
    async fn run(
        &mut self,
        handler: Arc<dyn PodEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

// =============================================================================
// Reply Publisher Port
// =============================================================================

/// Port for delivering replies to the origin system
#[async_trait]
pub trait ReplyPublisher: Send + Sync {
    async fn publish(&self, publish: &Publish) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ClusterVolumeApiRef = Arc<dyn ClusterVolumeApi>;
pub type PodEventHandlerRef = Arc<dyn PodEventHandler>;
pub type ReplyPublisherRef = Arc<dyn ReplyPublisher>;
