//! Hub configuration.
//!
//! Everything is fixed at process start; there is no runtime
//! reconfiguration surface.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4569
}

fn default_audio_device() -> String {
    "default".to_string()
}

fn default_registration_interval_ms() -> u64 {
    5 * 60 * 1000
}

/// Startup configuration for the hub.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Node identifier announced to the directory service.
    pub node_id: String,
    /// Shared secret for directory registration.
    pub node_secret: String,
    /// Name of the audio device to open.
    #[serde(default = "default_audio_device")]
    pub audio_device: String,
    /// Interface the UDP socket binds on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// UDP port the hub listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory service URL for periodic registration.
    pub registration_url: String,
    /// Interval between registrations in milliseconds.
    #[serde(default = "default_registration_interval_ms")]
    pub registration_interval_ms: u64,
    /// PEM text of the trusted RSA public key.
    pub public_key_pem: String,
}

impl HubConfig {
    /// Loads a configuration file, chosen JSON or YAML by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let cfg: HubConfig = match ext {
            "json" => serde_json::from_slice(&data)
                .map_err(|e| Error::Config(e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_slice(&data)
                .map_err(|e| Error::Config(e.to_string()))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other:?}"
                )));
            }
        };
        Ok(cfg)
    }

    /// The socket address string the hub binds on.
    pub fn bind_target(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
