//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the GET proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and derive the proxy's own authority
//! - Fetch from the upstream origin and run the rewrite pipeline
//! - Graceful shutdown on the lifecycle broadcast

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::client_response;
use crate::rewrite::{LinkTarget, Pipeline};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Application state injected into handlers.
///
/// Everything here is immutable; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub pipeline: Arc<Pipeline>,
    pub forward_status: bool,
}

/// HTTP server for the mirror proxy.
pub struct HttpServer {
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(proxy_handler))
            .route("/{*path}", get(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Build the shared state for a listener bound to `port`.
    fn build_state(&self, port: u16) -> Result<AppState, ServerError> {
        let target = LinkTarget::new(
            self.config.rewrite.own_scheme.clone(),
            self.config.own_authority(port),
            self.config.upstream.origin_marker.clone(),
        );
        let upstream = UpstreamClient::new(&self.config.upstream, &self.config.timeouts)?;

        Ok(AppState {
            upstream: Arc::new(upstream),
            pipeline: Arc::new(Pipeline::new(target)),
            forward_status: self.config.upstream.forward_status,
        })
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Links are rewritten to the port actually bound, so an ephemeral
    /// listener (port 0) works.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let state = self.build_state(addr.port())?;

        tracing::info!(
            address = %addr,
            upstream = %state.upstream.upstream_url("/"),
            own_authority = %state.pipeline.target().authority,
            "HTTP server starting"
        );

        let app = Self::build_router(&self.config, state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Fetches the same path from the origin and rewrites HTML responses.
async fn proxy_handler(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = state.upstream.upstream_url(path);

    tracing::debug!(request_id = %request_id, path = %path, url = %url, "Proxying request");

    let upstream = match state.upstream.fetch(&url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    // Parsing is CPU-bound; keep it off the async workers.
    let pipeline = state.pipeline.clone();
    let upstream_status = upstream.status;
    let processed = match tokio::task::spawn_blocking(move || pipeline.process_response(&upstream)).await {
        Ok(processed) => processed,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Rewrite task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Rewrite failed").into_response();
        }
    };

    tracing::info!(
        request_id = %request_id,
        path = %path,
        upstream_status = %upstream_status,
        bytes = processed.body.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Request proxied"
    );

    client_response(processed, state.forward_status)
}
