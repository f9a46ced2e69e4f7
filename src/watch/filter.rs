//! Pod Event Filter
//!
//! Narrows the namespace-wide pod event stream to pods carrying the agent's
//! ownership label. Only the presence of the label key matters.

use crate::domain::ports::{PodEventHandler, PodEventHandlerRef};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::trace;

/// Label key marking pods created by this agent
pub const DEFAULT_OWNERSHIP_LABEL: &str = "sync-agent.io/revision";

/// Whether `pod` carries the label key `label`
pub fn has_label(pod: &Pod, label: &str) -> bool {
    pod.labels().contains_key(label)
}

/// Forwards events for owned pods to an inner handler
pub struct OwnedPodFilter {
    label: String,
    inner: PodEventHandlerRef,
}

impl OwnedPodFilter {
    pub fn new(label: impl Into<String>, inner: PodEventHandlerRef) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }

    /// Ownership label key this filter gates on
    pub fn label(&self) -> &str {
        &self.label
    }

    fn is_owned(&self, pod: &Pod) -> bool {
        let owned = has_label(pod, &self.label);
        if !owned {
            trace!("Ignoring event for unowned pod {}", pod.name_any());
        }
        owned
    }
}

impl PodEventHandler for OwnedPodFilter {
    fn on_add(&self, pod: &Pod) {
        if self.is_owned(pod) {
            self.inner.on_add(pod);
        }
    }

    // Only the new object is inspected. A pod that loses the label stays
    // wherever the inner handler put it.
    fn on_update(&self, old: &Pod, new: &Pod) {
        if self.is_owned(new) {
            self.inner.on_update(old, new);
        }
    }

    fn on_delete(&self, pod: &Pod) {
        if self.is_owned(pod) {
            self.inner.on_delete(pod);
        }
    }
}
