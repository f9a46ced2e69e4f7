//! Pod Events
//!
//! Typed add/update/delete notifications and the store that derives them
//! from a list-then-watch stream.

use crate::domain::ports::PodEventHandler;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher;
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};

/// A single change to a pod
#[derive(Debug, Clone)]
pub enum PodEvent {
    /// First time a pod name is seen
    Added(Pod),
    /// A known pod changed
    Updated { old: Pod, new: Pod },
    /// A known pod went away
    Deleted(Pod),
}

impl PodEvent {
    /// Name of the pod this event is about
    pub fn pod_name(&self) -> String {
        match self {
            PodEvent::Added(pod) | PodEvent::Deleted(pod) => pod.name_any(),
            PodEvent::Updated { new, .. } => new.name_any(),
        }
    }

    /// Label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PodEvent::Added(_) => "add",
            PodEvent::Updated { .. } => "update",
            PodEvent::Deleted(_) => "delete",
        }
    }

    /// Invoke the matching handler callback
    pub fn dispatch(&self, handler: &dyn PodEventHandler) {
        match self {
            PodEvent::Added(pod) => handler.on_add(pod),
            PodEvent::Updated { old, new } => handler.on_update(old, new),
            PodEvent::Deleted(pod) => handler.on_delete(pod),
        }
    }
}

/// Last known state of every pod in the watched namespace.
///
/// The raw watch stream only says "applied" or "deleted"; the store tells
/// an add from an update and turns a re-list into the deletes it implies.
#[derive(Debug, Default)]
pub struct InformerStore {
    pods: HashMap<String, Pod>,
}

impl InformerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pods known, owned or not
    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    /// Fold a watcher event into the store, returning the resulting changes
    pub fn apply(&mut self, event: watcher::Event<Pod>) -> Vec<PodEvent> {
        match event {
            watcher::Event::Applied(pod) => vec![self.upsert(pod)],
            watcher::Event::Deleted(pod) => {
                let name = pod.name_any();
                self.pods.remove(&name);
                vec![PodEvent::Deleted(pod)]
            }
            watcher::Event::Restarted(pods) => {
                let listed: HashSet<String> = pods.iter().map(|p| p.name_any()).collect();
                let mut events: Vec<PodEvent> = pods.into_iter().map(|p| self.upsert(p)).collect();

                let gone: Vec<String> = self
                    .pods
                    .keys()
                    .filter(|name| !listed.contains(*name))
                    .cloned()
                    .collect();
                for name in gone {
                    if let Some(pod) = self.pods.remove(&name) {
                        events.push(PodEvent::Deleted(pod));
                    }
                }
                events
            }
        }
    }

    fn upsert(&mut self, pod: Pod) -> PodEvent {
        match self.pods.insert(pod.name_any(), pod.clone()) {
            Some(old) => PodEvent::Updated { old, new: pod },
            None => PodEvent::Added(pod),
        }
    }
}
