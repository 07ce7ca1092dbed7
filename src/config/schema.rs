//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the mirror proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host, port, public host).
    pub listener: ListenerConfig,

    /// The single upstream origin being mirrored.
    pub upstream: UpstreamConfig,

    /// Response rewriting settings.
    pub rewrite: RewriteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl ProxyConfig {
    /// Authority written into rewritten links for the given bound port.
    pub fn own_authority(&self, port: u16) -> String {
        format!("{}:{}", self.listener.public_host, port)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Listen port. Port 0 binds an ephemeral port.
    pub port: u16,

    /// Host clients use to reach the proxy; goes into rewritten links.
    pub public_host: String,
}

impl ListenerConfig {
    /// Socket address string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            public_host: "127.0.0.1".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme used to reach the origin ("https" or "http").
    pub scheme: String,

    /// Origin authority (host or host:port).
    pub host: String,

    /// Substring that identifies the origin inside a link's authority.
    pub origin_marker: String,

    /// Forward the upstream status code instead of always answering 200.
    pub forward_status: bool,

    /// User-Agent sent to the origin.
    pub user_agent: String,

    /// Honour HTTP(S)_PROXY environment variables for upstream fetches.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "habrahabr.ru".to_string(),
            origin_marker: "habr".to_string(),
            forward_status: false,
            user_agent: concat!("mirror-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            use_system_proxy: true,
        }
    }
}

/// Rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Scheme written into rewritten links.
    pub own_scheme: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            own_scheme: "http".to_string(),
        }
    }
}

/// Timeout configuration for upstream fetches and inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
        }
    }
}
