//! Response classification and rewriting.
//!
//! # Data Flow
//! ```text
//! RelayResponse (status, headers, raw bytes)
//!     → classify.rs (redirect / html / json / text / binary)
//!     → html.rs (attribute rewriting, <base> injection) for HTML only
//!     → Outbound (proxy redirect, or status + curated headers + body)
//! ```
//!
//! # Design Decisions
//! - Transformation faults fail open: an unrewritable link stays as-is,
//!   unparseable JSON returns the raw bytes. A single bad fragment never
//!   fails a page fetch.
//! - Attribute rewriting is regex-based and deliberately approximate; a
//!   real HTML parser would change observable behavior on malformed markup.

pub mod classify;
pub mod html;

pub use classify::{classify_and_rewrite, Outbound};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is percent-encoded,
/// matching what browsers produce for a URL carried in a query value.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Wrap an absolute target so follow-on navigation routes back through the
/// relay: `/proxy?url=<encoded target>`.
pub fn wrap_proxy_url(target: &Url) -> String {
    format!("/proxy?url={}", utf8_percent_encode(target.as_str(), COMPONENT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_with_component_encoding() {
        let url = Url::parse("https://example.com/new").unwrap();
        assert_eq!(wrap_proxy_url(&url), "/proxy?url=https%3A%2F%2Fexample.com%2Fnew");
    }

    #[test]
    fn query_and_port_survive_encoding() {
        let url = Url::parse("http://example.com:8080/a?b=c&d=e").unwrap();
        assert_eq!(
            wrap_proxy_url(&url),
            "/proxy?url=http%3A%2F%2Fexample.com%3A8080%2Fa%3Fb%3Dc%26d%3De"
        );
    }
}
