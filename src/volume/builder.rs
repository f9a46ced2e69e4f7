//! PV / PVC Construction
//!
//! Pure translation of a volume descriptor into the cluster objects the
//! reconciler submits. Nothing here talks to the cluster.

use crate::domain::ports::VolumeDescriptor;
use crate::error::{Error, Result};
use crate::volume::access_mode::{infer_from_provisioner, infer_from_source, AccessMode};
use crate::volume::naming::object_name;
use crate::volume::source::VolumeSource;
use k8s_openapi::api::core::v1::{
    NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, PersistentVolume,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PersistentVolumeSpec, VolumeNodeAffinity,
    VolumeResourceRequirements,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

// =============================================================================
// Constants
// =============================================================================

/// Legacy annotation read by clusters predating `spec.nodeAffinity`
pub const NODE_AFFINITY_ANNOTATION: &str = "volume.alpha.kubernetes.io/node-affinity";

/// Node label matched by the local volume affinity
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// Resource name for capacity and requests
const STORAGE_RESOURCE: &str = "storage";

// =============================================================================
// Helpers
// =============================================================================

/// Capacity quantity for a size in megabytes; `None` means unconstrained
pub fn size_quantity(size_mb: u64) -> Option<Quantity> {
    if size_mb == 0 {
        None
    } else {
        Some(Quantity(format!("{}Mi", size_mb)))
    }
}

fn storage_resources(size_mb: u64) -> Option<BTreeMap<String, Quantity>> {
    size_quantity(size_mb).map(|q| BTreeMap::from([(STORAGE_RESOURCE.to_string(), q)]))
}

/// Node selector pinning a volume to one host
pub fn hostname_selector(node_name: &str) -> NodeSelector {
    NodeSelector {
        node_selector_terms: vec![NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: HOSTNAME_LABEL.to_string(),
                operator: "In".to_string(),
                values: Some(vec![node_name.to_string()]),
            }]),
            match_fields: None,
        }],
    }
}

// =============================================================================
// Persistent Volume
// =============================================================================

/// Build the PV for a descriptor that does not reference an external class.
///
/// Local-disk sources are pinned to `node_name` when it is non-empty.
pub fn pv_from_volume(volume: &VolumeDescriptor, node_name: &str) -> Result<PersistentVolume> {
    let name = object_name(&volume.id);
    let source = VolumeSource::decode(&volume.id, &volume.source_config)?;
    let access_mode = infer_from_source(&source);
    let pin_to_node = source.is_local() && !node_name.is_empty();

    let mut spec = PersistentVolumeSpec {
        storage_class_name: Some(name.clone()),
        access_modes: Some(vec![access_mode.as_str().to_string()]),
        capacity: storage_resources(volume.size_mb),
        ..Default::default()
    };
    source.apply_to(&mut spec);

    let mut metadata = ObjectMeta {
        name: Some(name),
        ..Default::default()
    };

    if pin_to_node {
        let selector = hostname_selector(node_name);
        metadata.annotations = Some(BTreeMap::from([(
            NODE_AFFINITY_ANNOTATION.to_string(),
            serde_json::to_string(&selector)?,
        )]));
        spec.node_affinity = Some(VolumeNodeAffinity {
            required: Some(selector),
        });
    }

    Ok(PersistentVolume {
        metadata,
        spec: Some(spec),
        status: None,
    })
}

// =============================================================================
// Persistent Volume Claim
// =============================================================================

/// Build the PVC for a descriptor.
///
/// With `storage_class` the access mode follows the class provisioner,
/// otherwise it follows the descriptor's own source. The external class
/// name, when set, always wins over the synthetic per-volume class.
pub fn pvc_from_volume(
    volume: &VolumeDescriptor,
    storage_class: Option<&StorageClass>,
    namespace: &str,
) -> Result<PersistentVolumeClaim> {
    let name = object_name(&volume.id);

    let access_mode = match storage_class {
        Some(class) => infer_from_provisioner(&class.provisioner),
        None => infer_from_source(&VolumeSource::decode(&volume.id, &volume.source_config)?),
    };

    let storage_class_name = volume
        .external_storage_class()
        .map(str::to_string)
        .unwrap_or_else(|| name.clone());

    let spec = PersistentVolumeClaimSpec {
        storage_class_name: Some(storage_class_name),
        access_modes: Some(vec![access_mode.as_str().to_string()]),
        resources: storage_resources(volume.size_mb).map(|requests| VolumeResourceRequirements {
            requests: Some(requests),
            limits: None,
        }),
        ..Default::default()
    };

    Ok(PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(spec),
        status: None,
    })
}

// =============================================================================
// Compatibility
// =============================================================================

fn modes(list: Option<&Vec<String>>) -> Vec<AccessMode> {
    list.map(|l| l.iter().filter_map(|m| AccessMode::parse(m)).collect())
        .unwrap_or_default()
}

/// Check that a claim only requests access modes its volume supports
pub fn ensure_claim_compatible(pv: &PersistentVolume, pvc: &PersistentVolumeClaim) -> Result<()> {
    let supported = modes(pv.spec.as_ref().and_then(|s| s.access_modes.as_ref()));
    let requested = modes(pvc.spec.as_ref().and_then(|s| s.access_modes.as_ref()));

    if let Some(mode) = requested.iter().find(|m| !supported.contains(m)) {
        return Err(Error::AccessModeMismatch {
            claim: pvc.metadata.name.clone().unwrap_or_default(),
            requested: mode.to_string(),
            supported: supported
                .iter()
                .map(AccessMode::as_str)
                .collect::<Vec<_>>()
                .join(","),
        });
    }

    Ok(())
}
