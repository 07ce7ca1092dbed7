//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI port override (main.rs)
//!     → ProxyConfig (validated, immutable)
//!     → handed by value to the HTTP server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no process-wide port variable
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ListenerConfig, ProxyConfig, RewriteConfig, TimeoutConfig, UpstreamConfig};
pub use validation::{validate_config, ValidationError};
