//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require a parseable upstream credential — its absence is a fatal
//!   startup condition, never a per-request error
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the loaded config

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::RelayConfig;
use crate::upstream::credential::UpstreamCredential;

/// One semantic problem with the configuration.
#[derive(Debug)]
pub enum ValidationError {
    MissingCredential,
    InvalidCredential(String),
    InvalidBindAddress(String),
    ZeroTimeout(&'static str),
    ZeroBodyLimit,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingCredential => write!(
                f,
                "no upstream credential: set upstream.credential or the UPSTREAM_PROXY environment variable"
            ),
            ValidationError::InvalidCredential(e) => write!(f, "{}", e),
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "listener.bind_address {:?} is not a socket address", addr)
            }
            ValidationError::ZeroTimeout(field) => write!(f, "upstream.{} must be > 0", field),
            ValidationError::ZeroBodyLimit => write!(f, "limits.max_body_bytes must be > 0"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check `config` for semantic problems, collecting every error found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &config.upstream.credential {
        None => errors.push(ValidationError::MissingCredential),
        Some(raw) => {
            if let Err(e) = UpstreamCredential::parse(raw) {
                errors.push(ValidationError::InvalidCredential(e.to_string()));
            }
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_timeout_secs"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
