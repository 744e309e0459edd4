//! Upstream dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! client-supplied target URL
//!     → target.rs (normalize against optional base)
//!     → dispatch.rs (curate headers, send through upstream proxy)
//!     → RelayResponse (status, headers, raw body bytes)
//!     → rewrite layer decides what to transform
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream proxy per process; credential is immutable after
//!   startup and shared via Arc
//! - Redirect following is disabled at the transport level so 3xx responses
//!   reach the rewrite layer verbatim
//! - No automatic retries; a failed dispatch surfaces as `UpstreamFailure`

pub mod credential;
pub mod dispatch;
pub mod target;

pub use credential::UpstreamCredential;
pub use dispatch::{RelayRequest, RelayResponse, UpstreamDispatcher};
pub use target::normalize_target;

use axum::http::StatusCode;

/// Errors produced by the relay pipeline.
///
/// Only `UpstreamFailure` represents a transport fault; the others are
/// client mistakes and map to 4xx statuses. Content-transformation faults
/// (an unrewritable link, unparseable JSON) are not errors at all — they
/// degrade in place inside the rewrite layer.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No `url` query parameter was supplied.
    #[error("missing url parameter")]
    MissingTarget,

    /// The target URL (or a base it resolves against) failed to parse.
    #[error("invalid target url: {0}")]
    InvalidUrl(String),

    /// Connection, timeout, or protocol error talking to the destination
    /// through the upstream proxy.
    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),
}

impl RelayError {
    /// The HTTP status this error surfaces as on the proxy route.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingTarget | RelayError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
