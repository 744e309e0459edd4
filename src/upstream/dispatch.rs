//! Outbound request dispatch through the upstream proxy.
//!
//! # Responsibilities
//! - Build the one shared outbound client (proxy, no redirects, timeouts)
//! - Curate request headers (browser defaults, inbound overlay)
//! - Issue the request and hand back status, headers, and raw body bytes
//!
//! # Design Decisions
//! - Redirects are never followed here; 3xx responses return verbatim so
//!   the rewrite layer can wrap the Location target
//! - A timeout or connect failure is reported once as `UpstreamFailure`;
//!   retrying is an operator concern, not the dispatcher's

use std::time::Duration;

use axum::body::Bytes;
use axum::http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION};
use axum::http::Method;
use reqwest::redirect::Policy;
use url::Url;

use super::credential::UpstreamCredential;
use super::RelayError;

/// Baseline header set sent with every dispatch, matching what a desktop
/// browser would send. Inbound headers overlay these, so a client that
/// supplies its own `User-Agent` or `Accept-Language` wins.
const BROWSER_DEFAULTS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("accept-encoding", "gzip, deflate, br"),
    ("connection", "keep-alive"),
    ("cache-control", "no-cache"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
];

/// Inbound headers never forwarded to the destination. The first three
/// would leak the relay's own identity; content-length is recomputed from
/// the relayed body.
const DROPPED_INBOUND: &[&str] = &["host", "origin", "referer", "content-length"];

/// One outbound request, owned by a single relay invocation.
#[derive(Debug)]
pub struct RelayRequest {
    pub method: Method,
    /// Normalized absolute target. Invariant: has been through
    /// [`super::normalize_target`] exactly once.
    pub target: Url,
    /// Inbound request headers, curated at dispatch time.
    pub headers: HeaderMap,
    /// Query parameters to append to the target (the relay's own `url`
    /// parameter already stripped).
    pub query: Vec<(String, String)>,
    pub body: Bytes,
}

/// What came back from the destination, untransformed.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RelayResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Issues outbound requests through the fixed upstream proxy.
///
/// Holds the single shared `reqwest::Client`; cheap to clone via Arc in the
/// server state. Immutable after construction.
pub struct UpstreamDispatcher {
    client: reqwest::Client,
}

impl UpstreamDispatcher {
    /// Build the outbound client. Fails only if the client itself cannot be
    /// constructed (TLS backend initialization).
    pub fn new(
        credential: &UpstreamCredential,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let proxy = reqwest::Proxy::all(credential.endpoint_url())?
            .basic_auth(&credential.username, &credential.password);

        let client = reqwest::Client::builder()
            // 3xx must reach the rewrite layer, not be chased here
            .redirect(Policy::none())
            .proxy(proxy)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Send `req` to its target through the upstream proxy and collect the
    /// full response body.
    pub async fn dispatch(&self, req: RelayRequest) -> Result<RelayResponse, RelayError> {
        let method = reqwest::Method::from_bytes(req.method.as_str().as_bytes())
            .unwrap_or(reqwest::Method::GET);

        let mut url = req.target.clone();
        if !req.query.is_empty() {
            url.query_pairs_mut().extend_pairs(req.query.iter());
        }

        let mut builder = self
            .client
            .request(method, url.as_str())
            .headers(curated_headers(&req.headers));
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RelayError::UpstreamFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::UpstreamFailure(e.to_string()))?;

        Ok(RelayResponse {
            status,
            headers,
            body,
        })
    }
}

/// Browser defaults overlaid with the inbound headers, minus the drop list.
fn curated_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for &(name, value) in BROWSER_DEFAULTS {
        out.insert(name, HeaderValue::from_static(value));
    }
    for (name, value) in inbound {
        if DROPPED_INBOUND.contains(&name.as_str()) {
            continue;
        }
        out.insert(name.clone(), value.clone());
    }
    out
}
