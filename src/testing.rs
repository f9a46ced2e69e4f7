//! Test fixtures shared by the unit tests

use crate::domain::ports::{ClusterVolumeApi, CreateOutcome, PodEventHandler, ReplyPublisher};
use crate::error::{Error, Result};
use crate::gateway::Publish;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    ContainerStatus, PersistentVolume, PersistentVolumeClaim, Pod, PodSpec, PodStatus,
};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Pods
// =============================================================================

/// Pod with the given name and labels
pub fn pod(name: &str, labels: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Running pod with one ready container
pub fn running_pod(name: &str, ip: &str) -> Pod {
    let mut pod = pod(name, &[]);
    pod.spec = Some(PodSpec {
        node_name: Some("node1".to_string()),
        ..Default::default()
    });
    pod.status = Some(PodStatus {
        phase: Some("Running".to_string()),
        pod_ip: Some(ip.to_string()),
        host_ip: Some("192.168.1.10".to_string()),
        container_statuses: Some(vec![ContainerStatus {
            name: "main".to_string(),
            ready: true,
            restart_count: 0,
            ..Default::default()
        }]),
        ..Default::default()
    });
    pod
}

/// Handler recording every callback as `kind:name`
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl PodEventHandler for RecordingHandler {
    fn on_add(&self, pod: &Pod) {
        self.calls.lock().push(format!("add:{}", pod.name_any()));
    }

    fn on_update(&self, _old: &Pod, new: &Pod) {
        self.calls.lock().push(format!("update:{}", new.name_any()));
    }

    fn on_delete(&self, pod: &Pod) {
        self.calls.lock().push(format!("delete:{}", pod.name_any()));
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// In-memory cluster volume API with failure injection
#[derive(Default)]
pub struct FakeClusterApi {
    storage_classes: Mutex<BTreeMap<String, StorageClass>>,
    volumes: Mutex<BTreeMap<String, PersistentVolume>>,
    claims: Mutex<BTreeMap<(String, String), PersistentVolumeClaim>>,
    claim_failure: Mutex<Option<u16>>,
    claim_delay: Mutex<Option<Duration>>,
}

impl FakeClusterApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_storage_class(&self, name: &str, provisioner: &str) {
        let class = StorageClass {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            provisioner: provisioner.to_string(),
            ..Default::default()
        };
        self.storage_classes.lock().insert(name.to_string(), class);
    }

    /// Make every claim create fail with `code`
    pub fn fail_claims_with(&self, code: u16) {
        *self.claim_failure.lock() = Some(code);
    }

    /// Make every claim create take `delay` before it lands
    pub fn delay_claims(&self, delay: Duration) {
        *self.claim_delay.lock() = Some(delay);
    }

    pub fn persistent_volume(&self, name: &str) -> Option<PersistentVolume> {
        self.volumes.lock().get(name).cloned()
    }

    pub fn persistent_volume_count(&self) -> usize {
        self.volumes.lock().len()
    }

    pub fn claim(&self, namespace: &str, name: &str) -> Option<PersistentVolumeClaim> {
        self.claims
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.lock().len()
    }
}

fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".into(),
        message: reason.to_string(),
        reason: reason.to_string(),
        code,
    })
}

#[async_trait]
impl ClusterVolumeApi for FakeClusterApi {
    async fn get_storage_class(&self, name: &str) -> Result<StorageClass> {
        self.storage_classes
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::StorageClassNotFound {
                name: name.to_string(),
            })
    }

    async fn create_persistent_volume(&self, pv: &PersistentVolume) -> Result<CreateOutcome> {
        let name = pv.name_any();
        let mut volumes = self.volumes.lock();
        if volumes.contains_key(&name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        volumes.insert(name, pv.clone());
        Ok(CreateOutcome::Created)
    }

    async fn create_persistent_volume_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> Result<CreateOutcome> {
        let name = pvc.name_any();
        let delay = *self.claim_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = *self.claim_failure.lock() {
            return Err(Error::cluster(
                "PersistentVolumeClaim",
                &name,
                api_error(code, "InternalError"),
            ));
        }

        let key = (pvc.namespace().unwrap_or_default(), name);
        let mut claims = self.claims.lock();
        if claims.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        claims.insert(key, pvc.clone());
        Ok(CreateOutcome::Created)
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Publisher recording every reply, optionally failing
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<Publish>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Publish> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ReplyPublisher for RecordingPublisher {
    async fn publish(&self, publish: &Publish) -> Result<()> {
        if self.fail {
            return Err(Error::Internal("origin unreachable".into()));
        }
        self.sent.lock().push(publish.clone());
        Ok(())
    }
}
