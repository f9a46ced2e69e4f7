//! Deployment Sync Handler
//!
//! Handles one inbound deployment sync event: reconciles the unit's volumes,
//! builds the response and sends at most one reply. A failed reconciliation
//! sends no reply and returns the error to the caller.

use crate::domain::ports::{DeploymentSyncRequest, DeploymentSyncResponse, ReplyPublisherRef};
use crate::error::{Error, Result};
use crate::gateway::message::{Event, Publish, SYNC_REQUEST_KEY};
use crate::gateway::reply::{create_publish, reply};
use crate::volume::VolumeReconciler;
use crate::watch::PodCache;
use std::sync::Arc;
use tracing::{debug, info};

/// Serves deployment sync events
pub struct SyncHandler {
    reconciler: VolumeReconciler,
    cache: Arc<PodCache>,
    publisher: ReplyPublisherRef,
    default_namespace: String,
}

impl SyncHandler {
    pub fn new(
        reconciler: VolumeReconciler,
        cache: Arc<PodCache>,
        publisher: ReplyPublisherRef,
        default_namespace: impl Into<String>,
    ) -> Self {
        Self {
            reconciler,
            cache,
            publisher,
            default_namespace: default_namespace.into(),
        }
    }

    /// Handle `event` and deliver its reply, if one is expected.
    ///
    /// Returns the reply that was sent.
    pub async fn handle(&self, event: &Event) -> Result<Option<Publish>> {
        let publish = self.sync(event).await?;
        if let Some(publish) = &publish {
            reply(self.publisher.as_ref(), publish, event).await?;
        }
        Ok(publish)
    }

    /// Run the sync for `event` and build its reply without sending it
    pub async fn sync(&self, event: &Event) -> Result<Option<Publish>> {
        let request = decode_request(event)?;
        let namespace = if request.namespace.is_empty() {
            self.default_namespace.as_str()
        } else {
            request.namespace.as_str()
        };

        info!(
            event_id = %event.id,
            deployment_unit = %request.deployment_unit_uuid,
            "Syncing {} volumes into namespace {}",
            request.volumes.len(),
            namespace
        );

        let report = self
            .reconciler
            .reconcile(&request.volumes, namespace, &request.node_name)
            .await?;

        let pod_status = if request.pod_name().is_empty() {
            None
        } else {
            self.cache.get(request.pod_name()).map(|record| record.summary())
        };

        let response = DeploymentSyncResponse {
            deployment_unit_uuid: request.deployment_unit_uuid.clone(),
            node_name: request.node_name.clone(),
            volume_claims: report.claim_names(),
            pod_status,
        };

        if !event.expects_reply() {
            debug!("Event {} expects no reply", event.id);
            return Ok(None);
        }

        Ok(Some(create_publish(&response, event)?))
    }
}

fn decode_request(event: &Event) -> Result<DeploymentSyncRequest> {
    let raw = event
        .data
        .as_ref()
        .and_then(|data| data.get(SYNC_REQUEST_KEY))
        .ok_or_else(|| {
            Error::InvalidRequest(format!("event {} carries no {}", event.id, SYNC_REQUEST_KEY))
        })?;
    Ok(serde_json::from_value(raw.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::message::SYNC_RESPONSE_KEY;
    use crate::testing::{running_pod, FakeClusterApi, RecordingPublisher};
    use crate::volume::object_name;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn sync_event(reply_to: &str, request: serde_json::Value) -> Event {
        Event {
            id: "evt-1".into(),
            name: "deployment.sync".into(),
            reply_to: reply_to.into(),
            resource_id: None,
            data: Some(json!({ SYNC_REQUEST_KEY: request })),
        }
    }

    fn handler(api: Arc<FakeClusterApi>, publisher: Arc<RecordingPublisher>) -> (SyncHandler, Arc<PodCache>) {
        let cache = PodCache::new();
        let handler = SyncHandler::new(
            VolumeReconciler::new(api),
            cache.clone(),
            publisher,
            "default",
        );
        (handler, cache)
    }

    #[tokio::test]
    async fn test_sync_replies_with_claims_and_pod_status() {
        let api = FakeClusterApi::new();
        let publisher = Arc::new(RecordingPublisher::default());
        let (handler, cache) = handler(api.clone(), publisher.clone());
        cache.upsert(running_pod("du-1", "10.0.0.9"));

        let event = sync_event(
            "reply.evt-1",
            json!({
                "deploymentUnitUuid": "du-1",
                "nodeName": "node1",
                "volumes": [
                    {"id": "id1", "sizeMb": 1000, "sourceConfig": {"nfs": {"server": "0.0.0.0", "path": "/"}}}
                ]
            }),
        );

        let sent = handler.handle(&event).await.unwrap().unwrap();
        assert_eq!(publisher.sent(), vec![sent.clone()]);
        assert_eq!(sent.previous_id, "evt-1");
        assert_eq!(sent.name, "reply.evt-1");

        let response: DeploymentSyncResponse =
            serde_json::from_value(sent.data.unwrap()[SYNC_RESPONSE_KEY].clone()).unwrap();
        assert_eq!(response.volume_claims, vec![object_name("id1")]);
        assert_eq!(response.node_name, "node1");
        assert_eq!(
            response.pod_status.unwrap().pod_ip.as_deref(),
            Some("10.0.0.9")
        );

        // Namespace fell back to the configured default
        assert!(api.claim("default", &object_name("id1")).is_some());
    }

    #[tokio::test]
    async fn test_no_reply_channel_means_no_reply() {
        let api = FakeClusterApi::new();
        let publisher = Arc::new(RecordingPublisher::default());
        let (handler, _) = handler(api.clone(), publisher.clone());

        let event = sync_event("", json!({"deploymentUnitUuid": "du-1", "namespace": "apps"}));
        assert!(handler.handle(&event).await.unwrap().is_none());
        assert!(publisher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reconcile_sends_nothing() {
        let api = FakeClusterApi::new();
        let publisher = Arc::new(RecordingPublisher::default());
        let (handler, _) = handler(api.clone(), publisher.clone());

        let event = sync_event(
            "reply.evt-1",
            json!({"volumes": [{"id": "id1", "sourceConfig": {"bogus": {}}}]}),
        );

        let err = handler.handle(&event).await.unwrap_err();
        assert_matches!(err, Error::InvalidVolumeSource { .. });
        assert!(publisher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_event_without_request_is_rejected() {
        let api = FakeClusterApi::new();
        let publisher = Arc::new(RecordingPublisher::default());
        let (handler, _) = handler(api, publisher);

        let event = Event {
            id: "evt-2".into(),
            reply_to: "reply.evt-2".into(),
            ..Default::default()
        };
        assert_matches!(handler.handle(&event).await, Err(Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_reply_failure_surfaces() {
        let api = FakeClusterApi::new();
        let publisher = Arc::new(RecordingPublisher::failing());
        let (handler, _) = handler(api, publisher);

        let event = sync_event("reply.evt-1", json!({"deploymentUnitUuid": "du-1"}));
        assert_matches!(handler.handle(&event).await, Err(Error::Reply { .. }));
    }
}
