//! Agent Configuration
//!
//! Defaults, optionally overlaid by a YAML file, then by CLI flags.

use crate::error::{Error, Result};
use crate::watch::DEFAULT_OWNERSHIP_LABEL;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Configuration for the sync agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Namespace watched for pods and used for claims when a request names none
    pub namespace: String,
    /// Label key marking pods owned by this agent
    pub ownership_label: String,
    /// REST API bind address
    pub api_addr: String,
    /// Health server bind address
    pub health_addr: String,
    /// Metrics server bind address
    pub metrics_addr: String,
    /// Origin endpoint replies are posted to; replies are only logged when unset
    pub reply_url: Option<String>,
    /// Timeout for reply delivery in seconds
    pub reply_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            ownership_label: DEFAULT_OWNERSHIP_LABEL.to_string(),
            api_addr: "0.0.0.0:8090".to_string(),
            health_addr: "0.0.0.0:8081".to_string(),
            metrics_addr: "0.0.0.0:8080".to_string(),
            reply_url: None,
            reply_timeout_secs: 30,
        }
    }
}

impl AgentConfig {
    /// Load from a YAML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::Configuration("namespace must not be empty".into()));
        }
        if self.ownership_label.is_empty() {
            return Err(Error::Configuration(
                "ownership label must not be empty".into(),
            ));
        }
        for (what, addr) in [
            ("API", &self.api_addr),
            ("health", &self.health_addr),
            ("metrics", &self.metrics_addr),
        ] {
            parse_addr(what, addr)?;
        }
        Ok(())
    }

    pub fn api_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("API", &self.api_addr)
    }

    pub fn health_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("health", &self.health_addr)
    }

    pub fn metrics_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("metrics", &self.metrics_addr)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

fn parse_addr(what: &str, addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|e| Error::Configuration(format!("Invalid {} address {}: {}", what, addr, e)))
}
