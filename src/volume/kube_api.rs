//! Kubernetes Volume API Adapter
//!
//! `ClusterVolumeApi` over a live `kube::Client`.

use crate::domain::ports::{ClusterVolumeApi, CreateOutcome};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::debug;

/// Field manager recorded on objects this agent creates
pub const FIELD_MANAGER: &str = "kube-sync-agent";

/// Whether a cluster error means "an object with this name exists"
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409 || resp.reason == "AlreadyExists")
}

/// Whether a cluster error means "no such object"
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

fn create_outcome<K>(kind: &str, name: &str, result: kube::Result<K>) -> Result<CreateOutcome> {
    match result {
        Ok(_) => Ok(CreateOutcome::Created),
        Err(e) if is_already_exists(&e) => Ok(CreateOutcome::AlreadyExists),
        Err(e) => Err(Error::cluster(kind, name, e)),
    }
}

/// Cluster volume API backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeVolumeApi {
    client: Client,
    post_params: PostParams,
}

impl KubeVolumeApi {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            post_params: PostParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl ClusterVolumeApi for KubeVolumeApi {
    async fn get_storage_class(&self, name: &str) -> Result<StorageClass> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        debug!("Fetching storage class {}", name);
        api.get(name).await.map_err(|e| {
            if is_not_found(&e) {
                Error::StorageClassNotFound {
                    name: name.to_string(),
                }
            } else {
                Error::cluster("StorageClass", name, e)
            }
        })
    }

    async fn create_persistent_volume(&self, pv: &PersistentVolume) -> Result<CreateOutcome> {
        let name = pv.metadata.name.as_deref().unwrap_or_default();
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        create_outcome(
            "PersistentVolume",
            name,
            api.create(&self.post_params, pv).await,
        )
    }

    async fn create_persistent_volume_claim(
        &self,
        pvc: &PersistentVolumeClaim,
    ) -> Result<CreateOutcome> {
        let name = pvc.metadata.name.as_deref().unwrap_or_default();
        let namespace = pvc.metadata.namespace.as_deref().unwrap_or("default");
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        create_outcome(
            "PersistentVolumeClaim",
            name,
            api.create(&self.post_params, pvc).await,
        )
    }
}
