//! Upstream origin subsystem.
//!
//! # Data Flow
//! ```text
//! inbound path + query
//!     → client.rs (origin URL, GET, buffer body)
//!     → response.rs (UpstreamResponse, immutable)
//!     → rewrite pipeline
//! ```

pub mod client;
pub mod response;

pub use client::{UpstreamClient, UpstreamError};
pub use response::UpstreamResponse;
