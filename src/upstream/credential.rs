//! Upstream proxy credential.

use base64::{engine::general_purpose, Engine as _};
use std::fmt;

/// Credential and endpoint of the fixed upstream proxy.
///
/// Parsed once at startup from a `username:password@host:port` string and
/// never mutated afterwards; every dispatcher and socket relay reads the
/// same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCredential {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

/// Error for a credential string that does not match `user:pass@host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialParseError(pub String);

impl fmt::Display for CredentialParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid upstream credential {:?}: expected username:password@host:port",
            self.0
        )
    }
}

impl std::error::Error for CredentialParseError {}

impl UpstreamCredential {
    /// Parse a `username:password@host:port` credential string.
    ///
    /// The split on `@` is right-most so passwords may contain `@`.
    pub fn parse(raw: &str) -> Result<Self, CredentialParseError> {
        let err = || CredentialParseError(raw.to_string());

        let (userinfo, endpoint) = raw.rsplit_once('@').ok_or_else(err)?;
        let (username, password) = userinfo.split_once(':').ok_or_else(err)?;
        let (host, port) = endpoint.rsplit_once(':').ok_or_else(err)?;
        let port: u16 = port.parse().map_err(|_| err())?;

        if username.is_empty() || host.is_empty() {
            return Err(err());
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Proxy endpoint URL without credentials, e.g. `http://proxy.example:8000`.
    ///
    /// Authentication is attached separately (basic auth on the client
    /// builder, `Proxy-Authorization` on CONNECT) so credentials never need
    /// URL-escaping.
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `Basic <base64>` value for the `Proxy-Authorization` header.
    pub fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(raw.as_bytes()))
    }
}
