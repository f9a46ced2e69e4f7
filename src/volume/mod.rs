//! Volume Reconciliation Module
//!
//! Turns the volume descriptors of a deployment unit into cluster
//! PersistentVolumes and PersistentVolumeClaims:
//! - Access mode inference from the backend or storage class provisioner
//! - Deterministic object naming
//! - PV/PVC construction and idempotent creation

pub mod access_mode;
pub mod builder;
pub mod kube_api;
pub mod naming;
pub mod reconciler;
pub mod source;

pub use access_mode::*;
pub use builder::*;
pub use kube_api::*;
pub use naming::*;
pub use reconciler::*;
pub use source::*;
