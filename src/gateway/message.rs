//! Gateway Messages
//!
//! Envelopes exchanged with the origin system's event bus.

use serde::{Deserialize, Serialize};

/// Key under which a deployment sync request travels in `Event::data`
pub const SYNC_REQUEST_KEY: &str = "deploymentSyncRequest";

/// Key under which a deployment sync response travels in `Publish::data`
pub const SYNC_RESPONSE_KEY: &str = "deploymentSyncResponse";

/// Inbound request from the origin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Correlation id, echoed as `Publish::previous_id`
    pub id: String,
    /// Event name, e.g. `compute.instance.activate`
    #[serde(default)]
    pub name: String,
    /// Reply channel; empty when no reply is expected
    #[serde(default)]
    pub reply_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    /// Whether the sender is waiting on a reply
    pub fn expects_reply(&self) -> bool {
        !self.reply_to.is_empty()
    }
}

/// Outbound reply to the origin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publish {
    /// Id of the event being answered
    pub previous_id: String,
    /// Reply channel name taken from the event
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
