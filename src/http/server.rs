//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the proxy route and static fallback
//! - Wire up middleware (tracing, request ID, CORS)
//! - Build the shared state (dispatcher, upstream credential)
//! - Serve with graceful shutdown

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, State};
use axum::http::header::UPGRADE;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::{relay, websocket};
use crate::upstream::credential::CredentialParseError;
use crate::upstream::{UpstreamCredential, UpstreamDispatcher};

/// Application state injected into handlers.
///
/// Everything here is immutable after startup and shared across all
/// in-flight requests and socket pairs.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<UpstreamDispatcher>,
    pub credential: Arc<UpstreamCredential>,
    pub max_body_bytes: usize,
}

/// Error constructing the server from a validated config.
#[derive(Debug)]
pub enum ServerError {
    /// The upstream credential failed to parse.
    Credential(CredentialParseError),
    /// The outbound client could not be built.
    Client(reqwest::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Credential(e) => write!(f, "{}", e),
            ServerError::Client(e) => write!(f, "failed to build outbound client: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

/// HTTP server for the relay proxy.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
}

impl RelayServer {
    /// Create a new server from a validated configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let credential = UpstreamCredential::parse(
            config.upstream.credential.as_deref().unwrap_or_default(),
        )
        .map_err(ServerError::Credential)?;

        let dispatcher = UpstreamDispatcher::new(
            &credential,
            Duration::from_secs(config.upstream.request_timeout_secs),
            Duration::from_secs(config.upstream.connect_timeout_secs),
        )
        .map_err(ServerError::Client)?;

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            credential: Arc::new(credential),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/proxy", any(proxy_entry))
            .with_state(state);

        if config.static_files.enabled {
            router = router.fallback_service(
                ServeDir::new(&config.static_files.root_dir)
                    .append_index_html_on_directories(true),
            );
        }

        router
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CorsLayer::permissive())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "relay server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("relay server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Shared entry for the proxy route: WebSocket upgrades go to the socket
/// relay, everything else through the HTTP pipeline.
async fn proxy_entry(State(state): State<AppState>, req: Request<Body>) -> Response {
    if !is_upgrade_request(&req) {
        return relay::relay_handler(state, req).await;
    }

    let (mut parts, _body) = req.into_parts();
    let (target, _forwarded) = relay::split_query(parts.uri.query());
    let headers = parts.headers.clone();
    match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => websocket::relay_upgrade(upgrade, state, target, headers),
        Err(rejection) => rejection.into_response(),
    }
}

/// Whether the request asks to switch to the websocket protocol.
fn is_upgrade_request(req: &Request<Body>) -> bool {
    req.headers()
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
