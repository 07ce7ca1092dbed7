//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers, upstream client, rewrite pipeline
//!     → tracing events (request id, path, rewrite counts)
//!     → logging.rs subscriber (stdout)
//! ```

pub mod logging;

pub use logging::init_logging;
