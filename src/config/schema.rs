//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream proxy settings.
    pub upstream: UpstreamConfig,

    /// Static asset hosting.
    pub static_files: StaticFileConfig,

    /// Request limits.
    pub limits: LimitConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream proxy configuration.
///
/// The credential is the one process-wide secret; it may also be supplied
/// via the `UPSTREAM_PROXY` environment variable, which takes effect when
/// the config file leaves it unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream proxy credential as `username:password@host:port`.
    pub credential: Option<String>,

    /// Bound on one full outbound dispatch, seconds.
    pub request_timeout_secs: u64,

    /// Bound on establishing the outbound connection, seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            credential: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Static file hosting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFileConfig {
    /// Serve files for paths the relay routes do not claim.
    pub enabled: bool,

    /// Directory served at the root path.
    pub root_dir: String,
}

impl Default for StaticFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root_dir: "web".to_string(),
        }
    }
}

/// Request limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum inbound request body size, bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}
