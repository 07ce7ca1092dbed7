//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, GET routes, middleware)
//!     → request.rs (request ID)
//!     → upstream fetch → rewrite pipeline
//!     → response.rs (status, Content-Type, final body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
