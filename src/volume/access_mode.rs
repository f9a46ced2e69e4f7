//! Access Mode Inference
//!
//! Static classification of volume backends into single-node or multi-node
//! access. Unknown sources and provisioners fall back to single-node.

use crate::volume::source::VolumeSource;
use serde::{Deserialize, Serialize};

/// Provisioners whose volumes can be attached by several nodes at once
pub const SHARED_PROVISIONERS: &[&str] = &[
    "kubernetes.io/azure-file",
    "kubernetes.io/glusterfs",
    "kubernetes.io/quobyte",
    "kubernetes.io/portworx-volume",
];

/// Whether a volume can be attached by one node or by many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    /// `ReadWriteOnce`
    ExclusiveSingleNode,
    /// `ReadWriteMany`
    SharedMultiNode,
}

impl AccessMode {
    /// Kubernetes spelling of this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ExclusiveSingleNode => "ReadWriteOnce",
            AccessMode::SharedMultiNode => "ReadWriteMany",
        }
    }

    /// Parse the Kubernetes spelling; other modes are not produced by the agent
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "ReadWriteOnce" => Some(AccessMode::ExclusiveSingleNode),
            "ReadWriteMany" => Some(AccessMode::SharedMultiNode),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer the access mode of a concrete volume source
pub fn infer_from_source(source: &VolumeSource) -> AccessMode {
    match source {
        VolumeSource::AzureFile(_)
        | VolumeSource::CephFs(_)
        | VolumeSource::Glusterfs(_)
        | VolumeSource::Quobyte(_)
        | VolumeSource::Nfs(_)
        | VolumeSource::PortworxVolume(_) => AccessMode::SharedMultiNode,
        _ => AccessMode::ExclusiveSingleNode,
    }
}

/// Infer the access mode of volumes created by a storage class provisioner
pub fn infer_from_provisioner(provisioner: &str) -> AccessMode {
    if SHARED_PROVISIONERS.contains(&provisioner) {
        AccessMode::SharedMultiNode
    } else {
        AccessMode::ExclusiveSingleNode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(config: serde_json::Value) -> VolumeSource {
        VolumeSource::decode("vol", &config).unwrap()
    }

    #[test]
    fn test_shared_sources() {
        let shared = [
            json!({"nfs": {"server": "10.0.0.1", "path": "/export"}}),
            json!({"cephfs": {"monitors": ["10.0.0.2:6789"]}}),
            json!({"glusterfs": {"endpoints": "glusterfs-cluster", "path": "vol"}}),
            json!({"quobyte": {"registry": "registry:7861", "volume": "vol"}}),
            json!({"azureFile": {"secretName": "azure", "shareName": "share"}}),
            json!({"portworxVolume": {"volumeID": "pxvol"}}),
        ];
        for config in shared {
            assert_eq!(
                infer_from_source(&source(config.clone())),
                AccessMode::SharedMultiNode,
                "{config}"
            );
        }
    }

    #[test]
    fn test_single_node_sources() {
        let single = [
            json!({"local": {"path": "/mnt/disks/ssd1"}}),
            json!({"hostPath": {"path": "/var/data"}}),
            json!({"gcePersistentDisk": {"pdName": "volume1", "fsType": "ext4"}}),
            json!({"awsElasticBlockStore": {"volumeID": "vol-123"}}),
            json!({"csi": {"driver": "ebs.csi.aws.com", "volumeHandle": "vol-123"}}),
        ];
        for config in single {
            assert_eq!(
                infer_from_source(&source(config.clone())),
                AccessMode::ExclusiveSingleNode,
                "{config}"
            );
        }
    }

    #[test]
    fn test_provisioners() {
        for provisioner in SHARED_PROVISIONERS {
            assert_eq!(infer_from_provisioner(provisioner), AccessMode::SharedMultiNode);
        }
        assert_eq!(
            infer_from_provisioner("kubernetes.io/gce-pd"),
            AccessMode::ExclusiveSingleNode
        );
        assert_eq!(infer_from_provisioner(""), AccessMode::ExclusiveSingleNode);
        assert_eq!(
            infer_from_provisioner("example.com/unknown"),
            AccessMode::ExclusiveSingleNode
        );
    }

    #[test]
    fn test_mode_spelling() {
        assert_eq!(AccessMode::SharedMultiNode.as_str(), "ReadWriteMany");
        assert_eq!(AccessMode::parse("ReadWriteOnce"), Some(AccessMode::ExclusiveSingleNode));
        assert_eq!(AccessMode::parse("ReadOnlyMany"), None);
    }
}
