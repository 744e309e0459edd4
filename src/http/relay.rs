//! HTTP relay handling.
//!
//! # Responsibilities
//! - Extract the target URL from the `/proxy` query string
//! - Drive one request through normalize → dispatch → classify → send
//! - Map pipeline errors to client-visible statuses (400 / 500)
//!
//! Each request moves strictly through Received → Normalized → Dispatched →
//! Classified → Sent, with a single error exit from any stage.

use axum::body::{to_bytes, Body, Bytes};
use axum::http::header::LOCATION;
use axum::http::{request, Request, Response, StatusCode};
use url::form_urlencoded;

use crate::http::server::AppState;
use crate::rewrite::{classify_and_rewrite, Outbound};
use crate::upstream::{normalize_target, RelayError, RelayRequest};

/// Entry point for a non-upgrade request on the proxy route.
pub async fn relay_handler(state: AppState, req: Request<Body>) -> Response<Body> {
    let (parts, body) = req.into_parts();

    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(_) => {
            return plain_response(StatusCode::BAD_REQUEST, "request body too large");
        }
    };

    let method = parts.method.clone();
    match relay(&state, parts, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(method = %method, error = %e, "relay failed");
            plain_response(e.status(), &e.to_string())
        }
    }
}

/// The Received → Sent pipeline for one buffered request.
async fn relay(
    state: &AppState,
    parts: request::Parts,
    body: Bytes,
) -> Result<Response<Body>, RelayError> {
    // Received → Normalized: reject before any dispatch is attempted
    let (target_param, query) = split_query(parts.uri.query());
    let raw = target_param.ok_or(RelayError::MissingTarget)?;
    let target = normalize_target(&raw, None)?;
    tracing::debug!(method = %parts.method, target_url = %target, "target normalized");

    // Normalized → Dispatched
    let request = RelayRequest {
        method: parts.method.clone(),
        target: target.clone(),
        headers: parts.headers,
        query,
        body,
    };
    let response = state.dispatcher.dispatch(request).await?;
    tracing::info!(
        method = %parts.method,
        target_url = %target,
        status = response.status,
        "dispatched"
    );

    // Dispatched → Classified → Sent
    match classify_and_rewrite(&response, &target) {
        Outbound::Redirect(location) => {
            tracing::debug!(target_url = %target, location = %location, "redirect wrapped");
            Response::builder()
                .status(StatusCode::FOUND)
                .header(LOCATION, location)
                .body(Body::empty())
                .map_err(|e| RelayError::UpstreamFailure(e.to_string()))
        }
        Outbound::Body {
            status,
            headers,
            body,
        } => {
            let mut response = Response::builder()
                .status(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
                .body(Body::from(body))
                .map_err(|e| RelayError::UpstreamFailure(e.to_string()))?;
            *response.headers_mut() = headers;
            Ok(response)
        }
    }
}

/// Split a query string into the `url` target parameter and the remaining
/// pairs, which are forwarded to the destination.
pub(crate) fn split_query(query: Option<&str>) -> (Option<String>, Vec<(String, String)>) {
    let mut target = None;
    let mut rest = Vec::new();
    if let Some(query) = query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key == "url" && target.is_none() {
                target = Some(value.into_owned());
            } else {
                rest.push((key.into_owned(), value.into_owned()));
            }
        }
    }
    (target, rest)
}

fn plain_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::from(message.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
