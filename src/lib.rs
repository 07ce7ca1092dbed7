//! Mirror proxy library.
//!
//! Serves a single upstream origin through `localhost`, rewriting origin
//! links back to the proxy and marking six-letter words in HTML text.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
