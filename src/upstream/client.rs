//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Build the origin URL from the inbound path and query
//! - Perform the GET round-trip with connect and total timeouts
//! - Buffer the body so the pipeline can rewrite it
//!
//! # Design Decisions
//! - No retries: a failed fetch fails the inbound request
//! - Redirects are followed the way a browser would

use std::time::Duration;

use thiserror::Error;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::upstream::UpstreamResponse;

/// Errors talking to the origin.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The HTTP client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),

    /// Network error, DNS failure or timeout before a response arrived.
    #[error("upstream unreachable: {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response started but its body could not be read.
    #[error("failed to read upstream body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Client bound to a single origin.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    scheme: String,
    host: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(UpstreamError::Build)?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
            host: config.host.clone(),
        })
    }

    /// Origin URL for an inbound path (query string included, verbatim).
    pub fn upstream_url(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}://{}{}", self.scheme, self.host, path_and_query)
        } else {
            format!("{}://{}/{}", self.scheme, self.host, path_and_query)
        }
    }

    /// GET `url` and buffer the full response.
    pub async fn fetch(&self, url: &str) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| UpstreamError::Unreachable {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|source| UpstreamError::Body {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(
            url = %url,
            status = %status,
            bytes = body.len(),
            "Upstream response received"
        );

        Ok(UpstreamResponse::new(status, headers, body))
    }
}
