//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream origin and rewrite scheme
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.scheme must be \"http\" or \"https\", got {0:?}")]
    UpstreamScheme(String),

    #[error("upstream.host must not be empty")]
    EmptyUpstreamHost,

    #[error("upstream.origin_marker must not be empty")]
    EmptyOriginMarker,

    #[error("rewrite.own_scheme must be \"http\", got {0:?}")]
    OwnScheme(String),

    #[error("listener.public_host must not be empty")]
    EmptyPublicHost,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let scheme = config.upstream.scheme.as_str();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::UpstreamScheme(scheme.to_string()));
    }
    if config.upstream.host.trim().is_empty() {
        errors.push(ValidationError::EmptyUpstreamHost);
    }
    if config.upstream.origin_marker.is_empty() {
        errors.push(ValidationError::EmptyOriginMarker);
    }
    // The proxy speaks plain HTTP only.
    if config.rewrite.own_scheme != "http" {
        errors.push(ValidationError::OwnScheme(config.rewrite.own_scheme.clone()));
    }
    if config.listener.public_host.trim().is_empty() {
        errors.push(ValidationError::EmptyPublicHost);
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = ProxyConfig::default();
        config.upstream.scheme = "ftp".into();
        config.upstream.origin_marker = String::new();
        config.rewrite.own_scheme = "https".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::UpstreamScheme("ftp".into()),
                ValidationError::EmptyOriginMarker,
                ValidationError::OwnScheme("https".into()),
                ValidationError::ZeroTimeout("request_secs"),
            ]
        );
    }
}
