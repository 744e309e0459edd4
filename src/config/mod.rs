//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + UPSTREAM_PROXY env var
//!     → loader.rs (parse & overlay)
//!     → validation.rs (semantic checks, all errors at once)
//!     → RelayConfig (validated, immutable)
//!     → consumed once at server construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults so a minimal config (just the credential) works
//! - A missing or unparseable upstream credential fails startup, never a request

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, UPSTREAM_PROXY_ENV};
pub use schema::{LimitConfig, ListenerConfig, RelayConfig, StaticFileConfig, UpstreamConfig};
