//! Reply construction and delivery

use crate::domain::ports::{DeploymentSyncResponse, ReplyPublisher};
use crate::error::{Error, Result};
use crate::gateway::message::{Event, Publish, SYNC_RESPONSE_KEY};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Reply to `event` carrying no payload
pub fn empty_reply(event: &Event) -> Publish {
    Publish {
        previous_id: event.id.clone(),
        name: event.reply_to.clone(),
        data: None,
    }
}

/// Reply to `event` carrying a deployment sync response
pub fn create_publish(response: &DeploymentSyncResponse, event: &Event) -> Result<Publish> {
    let mut reply = empty_reply(event);
    reply.data = Some(serde_json::json!({
        SYNC_RESPONSE_KEY: serde_json::to_value(response)?,
    }));
    Ok(reply)
}

/// Deliver `publish` as the reply to `event`
pub async fn reply(publisher: &dyn ReplyPublisher, publish: &Publish, event: &Event) -> Result<()> {
    info!("Reply: {:?}", publish);
    publisher.publish(publish).await.map_err(|e| match e {
        e @ Error::Reply { .. } => e,
        e => Error::Reply {
            event_id: event.id.clone(),
            reason: e.to_string(),
        },
    })
}

// =============================================================================
// HTTP Publisher
// =============================================================================

/// Posts replies as JSON to the origin's publish endpoint
pub struct HttpReplyPublisher {
    client: reqwest::Client,
    url: String,
}

impl HttpReplyPublisher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReplyPublisher for HttpReplyPublisher {
    async fn publish(&self, publish: &Publish) -> Result<()> {
        let response = self.client.post(&self.url).json(publish).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Reply {
                event_id: publish.previous_id.clone(),
                reason: format!("origin answered {}", status),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Log Publisher
// =============================================================================

/// Publisher used when no origin endpoint is configured
#[derive(Debug, Default)]
pub struct LogReplyPublisher;

#[async_trait]
impl ReplyPublisher for LogReplyPublisher {
    async fn publish(&self, publish: &Publish) -> Result<()> {
        info!(
            previous_id = %publish.previous_id,
            name = %publish.name,
            "No reply endpoint configured, dropping reply"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPublisher;
    use assert_matches::assert_matches;

    fn event() -> Event {
        Event {
            id: "evt-1".into(),
            name: "deployment.sync".into(),
            reply_to: "reply.evt-1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_reply_correlates() {
        let publish = empty_reply(&event());
        assert_eq!(publish.previous_id, "evt-1");
        assert_eq!(publish.name, "reply.evt-1");
        assert!(publish.data.is_none());
    }

    #[test]
    fn test_create_publish_wraps_response() {
        let response = DeploymentSyncResponse {
            deployment_unit_uuid: "du-1".into(),
            node_name: String::new(),
            volume_claims: vec!["abc".into()],
            pod_status: None,
        };
        let publish = create_publish(&response, &event()).unwrap();
        let data = publish.data.unwrap();
        assert_eq!(
            data[SYNC_RESPONSE_KEY]["volumeClaims"],
            serde_json::json!(["abc"])
        );
        assert_eq!(data[SYNC_RESPONSE_KEY]["deploymentUnitUuid"], "du-1");
    }

    #[tokio::test]
    async fn test_reply_failure_names_event() {
        let publisher = RecordingPublisher::failing();
        let err = reply(&publisher, &empty_reply(&event()), &event())
            .await
            .unwrap_err();
        assert_matches!(err, Error::Reply { event_id, .. } if event_id == "evt-1");
    }

    /// Publisher failing the way the HTTP publisher does on a non-2xx answer
    struct RejectingOrigin;

    #[async_trait]
    impl ReplyPublisher for RejectingOrigin {
        async fn publish(&self, publish: &Publish) -> Result<()> {
            Err(Error::Reply {
                event_id: publish.previous_id.clone(),
                reason: "origin answered 500".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_reply_error_is_not_wrapped_twice() {
        let err = reply(&RejectingOrigin, &empty_reply(&event()), &event())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error sending reply evt-1: origin answered 500");
    }

    #[tokio::test]
    async fn test_log_publisher_accepts() {
        assert!(LogReplyPublisher.publish(&empty_reply(&event())).await.is_ok());
    }
}
