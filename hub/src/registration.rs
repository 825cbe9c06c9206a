//! Periodic node registration with the directory service.
//!
//! The scheduler only needs a trigger-on-interval contract; the HTTP
//! details live behind the [`Registrar`] trait so tests can substitute a
//! recording stub.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::config::HubConfig;
use crate::error::{Error, Result};

/// One node entry in the registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NodeEntry {
    /// Node identifier.
    pub node: String,
    /// Shared secret.
    pub passwd: String,
    /// Remote flag; this hub always announces 0.
    pub remote: u8,
}

/// The nodes map carried in the payload body.
#[derive(Debug, Clone, Serialize)]
pub struct NodesData {
    /// Map from node id to its entry.
    pub nodes: HashMap<String, NodeEntry>,
}

/// The registration payload posted to the directory service.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationPayload {
    /// Port other peers should reach this node on.
    pub port: u16,
    /// Node announcement body.
    pub data: NodesData,
}

impl RegistrationPayload {
    /// Builds the announcement for a single node.
    pub fn for_node(node_id: &str, node_secret: &str, port: u16) -> Self {
        let entry = NodeEntry {
            node: node_id.to_string(),
            passwd: node_secret.to_string(),
            remote: 0,
        };
        let mut nodes = HashMap::new();
        nodes.insert(node_id.to_string(), entry);
        Self { port, data: NodesData { nodes } }
    }
}

/// Announces reachability to the directory service.
pub trait Registrar {
    /// Performs one registration attempt.
    fn register(&mut self) -> Result<()>;
}

/// HTTP registrar posting the payload as JSON.
pub struct HttpRegistrar {
    agent: ureq::Agent,
    url: String,
    payload: RegistrationPayload,
}

impl HttpRegistrar {
    /// Creates a registrar for the configured directory service. The
    /// request timeout is kept short so a slow registrar cannot stall the
    /// loop for long.
    pub fn new(config: &HubConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(10)))
            .build()
            .into();
        let payload =
            RegistrationPayload::for_node(&config.node_id, &config.node_secret, config.port);
        Self { agent, url: config.registration_url.clone(), payload }
    }
}

impl Registrar for HttpRegistrar {
    fn register(&mut self) -> Result<()> {
        let mut response = self
            .agent
            .post(&self.url)
            .send_json(&self.payload)
            .map_err(|e| Error::Registration(e.to_string()))?;
        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());
        info!(response = %body.trim(), "registration accepted");
        Ok(())
    }
}
