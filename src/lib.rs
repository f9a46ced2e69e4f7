//! Kube Sync Agent
//!
//! Materializes the volumes of a deployment unit as Kubernetes
//! PersistentVolumes and PersistentVolumeClaims, and keeps a live cache of
//! the pods the agent owns for status reporting.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         Reply Gateway / REST                          │
//! │            (inbound sync events, replies to the origin)               │
//! ├──────────────────────────────────┬───────────────────────────────────┤
//! │        Volume Reconciler         │        Pod State Watcher          │
//! │  access modes, naming, PV/PVC    │  list-then-watch, label filter,   │
//! │  build, idempotent create        │  concurrent pod cache             │
//! ├──────────────────────────────────┴───────────────────────────────────┤
//! │                     Kubernetes API (kube client)                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`volume`]: Volume reconciliation
//! - [`watch`]: Pod state watching and caching
//! - [`gateway`]: Event/reply envelopes and the sync handler
//! - [`api`]: REST server
//! - [`config`]: Agent configuration
//! - [`domain`]: Core data model and ports
//! - [`error`]: Error types and handling

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod volume;
pub mod watch;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use config::AgentConfig;

pub use domain::ports::{
    ClusterVolumeApi, CreateOutcome, DeploymentSyncRequest, DeploymentSyncResponse,
    PodEventHandler, PodEventSource, PodStatusSummary, ReplyPublisher, VolumeDescriptor,
};

pub use error::{Error, ErrorCategory, Result};

pub use gateway::{Event, HttpReplyPublisher, LogReplyPublisher, Publish, SyncHandler};

pub use metrics::AgentMetrics;

pub use volume::{
    object_name, pv_from_volume, pvc_from_volume, AccessMode, KubeVolumeApi, ReconcileReport,
    VolumeReconciler, VolumeSource,
};

pub use watch::{KubePodEventSource, PodCache, PodRecord, PodWatcher, WatchHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
