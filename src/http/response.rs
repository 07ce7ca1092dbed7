//! Client response construction.
//!
//! # Responsibilities
//! - Turn a (possibly rewritten) upstream response into the client response
//! - Copy Content-Type only; Content-Length follows the final body
//!
//! # Design Decisions
//! - Status is 200 unless upstream status forwarding is enabled
//! - Other upstream headers (cookies, caching, encoding) are not relayed

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;

use crate::upstream::UpstreamResponse;

/// Build the response sent to the inbound client.
pub fn client_response(upstream: UpstreamResponse, forward_status: bool) -> Response {
    let content_type = upstream.headers.get(header::CONTENT_TYPE).cloned();

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = if forward_status {
        upstream.status
    } else {
        StatusCode::OK
    };
    if let Some(value) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}
