//! Response classification.
//!
//! Decides, from status and content-type, what a relayed response turns
//! into on its way back to the client. Priority order: redirect, HTML,
//! JSON, other text, opaque binary.

use axum::body::Bytes;
use axum::http::header::HeaderMap;
use url::Url;

use crate::upstream::{normalize_target, RelayResponse};

use super::html::rewrite_html;
use super::wrap_proxy_url;

/// Response headers copied verbatim from the upstream response.
///
/// Content-length is deliberately not on the list: the body may have been
/// rewritten, so framing is recomputed when the response is sent.
const COPIED_HEADERS: &[&str] = &[
    "content-type",
    "content-encoding",
    "content-language",
    "cache-control",
    "expires",
    "last-modified",
    "etag",
];

/// What the relay sends back to its client.
#[derive(Debug)]
pub enum Outbound {
    /// Answer with the relay's own redirect to this wrapped URL, keeping
    /// the whole redirect chain inside the proxy.
    Redirect(String),
    /// Deliver the upstream status with curated headers and the (possibly
    /// rewritten) body.
    Body {
        status: u16,
        headers: HeaderMap,
        body: Bytes,
    },
}

/// Classify `resp` and apply the matching transformation.
///
/// `target` is the normalized URL the response came from; redirect targets
/// and relative links resolve against its origin.
pub fn classify_and_rewrite(resp: &RelayResponse, target: &Url) -> Outbound {
    if resp.is_redirect() {
        if let Some(location) = resp.location() {
            if let Ok(absolute) = normalize_target(location, Some(target.as_str())) {
                return Outbound::Redirect(wrap_proxy_url(&absolute));
            }
            // Location refused to normalize: fall through to passthrough
            // rather than failing the response.
        }
    }

    let content_type = resp.content_type().to_ascii_lowercase();
    let body = if content_type.contains("text/html") {
        let text = String::from_utf8_lossy(&resp.body);
        Bytes::from(rewrite_html(&text, target))
    } else if content_type.contains("application/json") {
        reserialize_json(&resp.body)
    } else {
        // other text and binary pass through byte-for-byte
        resp.body.clone()
    };

    Outbound::Body {
        status: resp.status,
        headers: copied_headers(&resp.headers),
        body,
    }
}

/// Parse and re-serialize a JSON body; hand back the original bytes if it
/// does not parse.
fn reserialize_json(body: &Bytes) -> Bytes {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => match serde_json::to_vec(&value) {
            Ok(out) => Bytes::from(out),
            Err(_) => body.clone(),
        },
        Err(_) => body.clone(),
    }
}

fn copied_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in COPIED_HEADERS {
        for value in upstream.get_all(*name) {
            out.append(*name, value.clone());
        }
    }
    out
}
