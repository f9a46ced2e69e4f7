//! Volume Sources
//!
//! Decodes a volume descriptor's source document into exactly one concrete
//! persistent volume backend.

use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    AWSElasticBlockStoreVolumeSource, AzureDiskVolumeSource, AzureFilePersistentVolumeSource,
    CSIPersistentVolumeSource, CephFSPersistentVolumeSource, CinderPersistentVolumeSource,
    FCVolumeSource, GCEPersistentDiskVolumeSource, GlusterfsPersistentVolumeSource,
    HostPathVolumeSource, ISCSIPersistentVolumeSource, LocalVolumeSource, NFSVolumeSource,
    PersistentVolumeSpec, PortworxVolumeSource, QuobyteVolumeSource, RBDPersistentVolumeSource,
    VsphereVirtualDiskVolumeSource,
};
use serde::{Deserialize, Serialize};

/// A concrete persistent volume backend.
///
/// The wire format is a single-key document naming the backend, the same
/// shape the backend takes inside a `PersistentVolumeSpec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VolumeSource {
    #[serde(rename = "awsElasticBlockStore")]
    AwsElasticBlockStore(AWSElasticBlockStoreVolumeSource),
    #[serde(rename = "azureDisk")]
    AzureDisk(AzureDiskVolumeSource),
    #[serde(rename = "azureFile")]
    AzureFile(AzureFilePersistentVolumeSource),
    #[serde(rename = "cephfs")]
    CephFs(CephFSPersistentVolumeSource),
    #[serde(rename = "cinder")]
    Cinder(CinderPersistentVolumeSource),
    #[serde(rename = "csi")]
    Csi(CSIPersistentVolumeSource),
    #[serde(rename = "fc")]
    Fc(FCVolumeSource),
    #[serde(rename = "gcePersistentDisk")]
    GcePersistentDisk(GCEPersistentDiskVolumeSource),
    #[serde(rename = "glusterfs")]
    Glusterfs(GlusterfsPersistentVolumeSource),
    #[serde(rename = "hostPath")]
    HostPath(HostPathVolumeSource),
    #[serde(rename = "iscsi")]
    Iscsi(ISCSIPersistentVolumeSource),
    #[serde(rename = "local")]
    Local(LocalVolumeSource),
    #[serde(rename = "nfs")]
    Nfs(NFSVolumeSource),
    #[serde(rename = "portworxVolume")]
    PortworxVolume(PortworxVolumeSource),
    #[serde(rename = "quobyte")]
    Quobyte(QuobyteVolumeSource),
    #[serde(rename = "rbd")]
    Rbd(RBDPersistentVolumeSource),
    #[serde(rename = "vsphereVolume")]
    VsphereVolume(VsphereVirtualDiskVolumeSource),
}

impl VolumeSource {
    /// Decode a descriptor's source document
    pub fn decode(volume_id: &str, config: &serde_json::Value) -> Result<Self> {
        if config.is_null() {
            return Err(Error::InvalidVolumeSource {
                volume_id: volume_id.to_string(),
                reason: "no source config".to_string(),
            });
        }

        let source: Self =
            serde_json::from_value(config.clone()).map_err(|e| Error::InvalidVolumeSource {
                volume_id: volume_id.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(field) = source.missing_field() {
            return Err(Error::InvalidVolumeSource {
                volume_id: volume_id.to_string(),
                reason: format!("{}.{} is required", source.kind(), field),
            });
        }
        Ok(source)
    }

    /// First required field left empty.
    ///
    /// Absent required fields decode to empty defaults, so they are
    /// checked here rather than by serde.
    fn missing_field(&self) -> Option<&'static str> {
        fn first_empty(fields: &[(&'static str, &str)]) -> Option<&'static str> {
            fields
                .iter()
                .find(|(_, value)| value.is_empty())
                .map(|(name, _)| *name)
        }

        match self {
            VolumeSource::AwsElasticBlockStore(s) => first_empty(&[("volumeID", &s.volume_id)]),
            VolumeSource::AzureDisk(s) => {
                first_empty(&[("diskName", &s.disk_name), ("diskURI", &s.disk_uri)])
            }
            VolumeSource::AzureFile(s) => {
                first_empty(&[("secretName", &s.secret_name), ("shareName", &s.share_name)])
            }
            VolumeSource::CephFs(s) => s.monitors.is_empty().then_some("monitors"),
            VolumeSource::Cinder(s) => first_empty(&[("volumeID", &s.volume_id)]),
            VolumeSource::Csi(s) => {
                first_empty(&[("driver", &s.driver), ("volumeHandle", &s.volume_handle)])
            }
            VolumeSource::Fc(_) => None,
            VolumeSource::GcePersistentDisk(s) => first_empty(&[("pdName", &s.pd_name)]),
            VolumeSource::Glusterfs(s) => {
                first_empty(&[("endpoints", &s.endpoints), ("path", &s.path)])
            }
            VolumeSource::HostPath(s) => first_empty(&[("path", &s.path)]),
            VolumeSource::Iscsi(s) => {
                first_empty(&[("iqn", &s.iqn), ("targetPortal", &s.target_portal)])
            }
            VolumeSource::Local(s) => first_empty(&[("path", &s.path)]),
            VolumeSource::Nfs(s) => first_empty(&[("server", &s.server), ("path", &s.path)]),
            VolumeSource::PortworxVolume(s) => first_empty(&[("volumeID", &s.volume_id)]),
            VolumeSource::Quobyte(s) => {
                first_empty(&[("registry", &s.registry), ("volume", &s.volume)])
            }
            VolumeSource::Rbd(s) => s
                .monitors
                .is_empty()
                .then_some("monitors")
                .or_else(|| first_empty(&[("image", &s.image)])),
            VolumeSource::VsphereVolume(s) => first_empty(&[("volumePath", &s.volume_path)]),
        }
    }

    /// Backend name, as spelled in the source document
    pub fn kind(&self) -> &'static str {
        match self {
            VolumeSource::AwsElasticBlockStore(_) => "awsElasticBlockStore",
            VolumeSource::AzureDisk(_) => "azureDisk",
            VolumeSource::AzureFile(_) => "azureFile",
            VolumeSource::CephFs(_) => "cephfs",
            VolumeSource::Cinder(_) => "cinder",
            VolumeSource::Csi(_) => "csi",
            VolumeSource::Fc(_) => "fc",
            VolumeSource::GcePersistentDisk(_) => "gcePersistentDisk",
            VolumeSource::Glusterfs(_) => "glusterfs",
            VolumeSource::HostPath(_) => "hostPath",
            VolumeSource::Iscsi(_) => "iscsi",
            VolumeSource::Local(_) => "local",
            VolumeSource::Nfs(_) => "nfs",
            VolumeSource::PortworxVolume(_) => "portworxVolume",
            VolumeSource::Quobyte(_) => "quobyte",
            VolumeSource::Rbd(_) => "rbd",
            VolumeSource::VsphereVolume(_) => "vsphereVolume",
        }
    }

    /// Whether the data lives on a single node's local disk
    pub fn is_local(&self) -> bool {
        matches!(self, VolumeSource::Local(_))
    }

    /// Set the matching backend field on a PV spec
    pub fn apply_to(self, spec: &mut PersistentVolumeSpec) {
        match self {
            VolumeSource::AwsElasticBlockStore(s) => spec.aws_elastic_block_store = Some(s),
            VolumeSource::AzureDisk(s) => spec.azure_disk = Some(s),
            VolumeSource::AzureFile(s) => spec.azure_file = Some(s),
            VolumeSource::CephFs(s) => spec.cephfs = Some(s),
            VolumeSource::Cinder(s) => spec.cinder = Some(s),
            VolumeSource::Csi(s) => spec.csi = Some(s),
            VolumeSource::Fc(s) => spec.fc = Some(s),
            VolumeSource::GcePersistentDisk(s) => spec.gce_persistent_disk = Some(s),
            VolumeSource::Glusterfs(s) => spec.glusterfs = Some(s),
            VolumeSource::HostPath(s) => spec.host_path = Some(s),
            VolumeSource::Iscsi(s) => spec.iscsi = Some(s),
            VolumeSource::Local(s) => spec.local = Some(s),
            VolumeSource::Nfs(s) => spec.nfs = Some(s),
            VolumeSource::PortworxVolume(s) => spec.portworx_volume = Some(s),
            VolumeSource::Quobyte(s) => spec.quobyte = Some(s),
            VolumeSource::Rbd(s) => spec.rbd = Some(s),
            VolumeSource::VsphereVolume(s) => spec.vsphere_volume = Some(s),
        }
    }
}
