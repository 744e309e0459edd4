//! WebSocket relay.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Open the companion socket to the target through the upstream proxy
//! - Forward frames verbatim in both directions until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←── frames ──→ Relay ←── frames ──→ Target
//!                         │
//!                         └── CONNECT tunnel via upstream proxy
//! ```
//!
//! # Design Decisions
//! - Frame-level forwarding, no message buffering
//! - Close and error are equivalent for teardown: either one ends both
//!   directions, and both sockets are torn down together
//! - Rejection paths complete the inbound handshake first, then close with
//!   1008 (missing target) or 1011 (normalize/connect failure)

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as TargetCloseFrame;
use tokio_tungstenite::tungstenite::Message as TargetMessage;
use tokio_tungstenite::{client_async_tls, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::http::server::AppState;
use crate::upstream::{normalize_target, RelayError, UpstreamCredential};

type TargetSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound headers owned by the handshake machinery; everything else is
/// forwarded to the target for origin/protocol negotiation.
const HANDSHAKE_HEADERS: &[&str] = &[
    "host",
    "connection",
    "upgrade",
    "sec-websocket-key",
    "sec-websocket-version",
    "sec-websocket-accept",
    "sec-websocket-extensions",
    "content-length",
];

/// Accept the upgrade and hand the socket to the relay task.
pub fn relay_upgrade(
    ws: WebSocketUpgrade,
    state: AppState,
    target_param: Option<String>,
    headers: HeaderMap,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, target_param, headers))
}

/// Per-connection lifecycle: Upgraded → TargetConnecting → Relaying → Closed.
async fn handle_socket(
    mut client: WebSocket,
    state: AppState,
    target_param: Option<String>,
    headers: HeaderMap,
) {
    let Some(raw) = target_param else {
        tracing::warn!("websocket upgrade without url parameter");
        close_with(&mut client, close_code::POLICY, "missing url parameter").await;
        return;
    };

    let target = match normalize_target(&raw, None).and_then(socket_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(raw = %raw, error = %e, "websocket target rejected");
            close_with(&mut client, close_code::ERROR, "invalid target url").await;
            return;
        }
    };

    let target_socket = match connect_target(&target, &headers, &state.credential).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!(target_url = %target, error = %e, "websocket target connect failed");
            close_with(&mut client, close_code::ERROR, "target connection failed").await;
            return;
        }
    };

    tracing::info!(target_url = %target, "websocket relay established");
    relay_frames(client, target_socket).await;
    tracing::debug!(target_url = %target, "websocket relay closed");
}

/// Map the normalized target onto a socket scheme.
fn socket_url(url: Url) -> Result<Url, RelayError> {
    let scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url),
        "http" => "ws",
        "https" => "wss",
        _ => return Err(RelayError::InvalidUrl(url.into())),
    };
    let mut url = url;
    if url.set_scheme(scheme).is_err() {
        return Err(RelayError::InvalidUrl(url.into()));
    }
    Ok(url)
}

/// Open the outbound socket: CONNECT tunnel through the upstream proxy,
/// then the WebSocket handshake (TLS for wss) over that stream.
async fn connect_target(
    target: &Url,
    inbound: &HeaderMap,
    credential: &UpstreamCredential,
) -> Result<TargetSocket, RelayError> {
    let host = target
        .host_str()
        .ok_or_else(|| RelayError::InvalidUrl(target.as_str().to_string()))?;
    let port = target.port_or_known_default().unwrap_or(443);

    let stream = connect_tunnel(credential, host, port).await?;

    let mut request = target
        .as_str()
        .into_client_request()
        .map_err(|e| RelayError::UpstreamFailure(e.to_string()))?;
    for (name, value) in inbound {
        if HANDSHAKE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        request.headers_mut().insert(name.clone(), value.clone());
    }

    let (socket, _response) = client_async_tls(request, stream)
        .await
        .map_err(|e| RelayError::UpstreamFailure(e.to_string()))?;
    Ok(socket)
}

/// Establish a raw TCP tunnel to `host:port` via HTTP CONNECT on the
/// upstream proxy.
async fn connect_tunnel(
    credential: &UpstreamCredential,
    host: &str,
    port: u16,
) -> Result<TcpStream, RelayError> {
    let io_err = |e: std::io::Error| RelayError::UpstreamFailure(e.to_string());

    let mut stream = TcpStream::connect((credential.host.as_str(), credential.port))
        .await
        .map_err(io_err)?;

    let connect = format!(
        "CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\nProxy-Authorization: {auth}\r\n\r\n",
        auth = credential.basic_auth(),
    );
    stream.write_all(connect.as_bytes()).await.map_err(io_err)?;

    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await.map_err(io_err)?;
    let response = String::from_utf8_lossy(&buf[..n]);
    if !response.starts_with("HTTP/1.1 200") && !response.starts_with("HTTP/1.0 200") {
        return Err(RelayError::UpstreamFailure(format!(
            "upstream proxy rejected CONNECT: {}",
            response.lines().next().unwrap_or("no response"),
        )));
    }

    Ok(stream)
}

/// Forward frames in both directions until either side closes or errors.
///
/// Each direction preserves its own frame order; nothing is guaranteed
/// between the two. When one branch finishes, the select drops the halves
/// of both sockets, so neither can outlive its pair partner. Dropping an
/// already-closed socket is a no-op, which keeps teardown idempotent.
async fn relay_frames(client: WebSocket, target: TargetSocket) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut target_tx, mut target_rx) = target.split();

    let client_to_target = async {
        while let Some(msg) = client_rx.next().await {
            let Ok(msg) = msg else { break };
            // a failed send means the target stopped accepting frames
            if target_tx.send(to_target_message(msg)).await.is_err() {
                break;
            }
        }
    };

    let target_to_client = async {
        while let Some(msg) = target_rx.next().await {
            let Ok(msg) = msg else { break };
            let Some(msg) = to_client_message(msg) else {
                continue;
            };
            if client_tx.send(msg).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_target => {}
        _ = target_to_client => {}
    }
}

fn to_target_message(msg: Message) -> TargetMessage {
    match msg {
        Message::Text(text) => TargetMessage::Text(text.as_str().into()),
        Message::Binary(data) => TargetMessage::Binary(data),
        Message::Ping(data) => TargetMessage::Ping(data),
        Message::Pong(data) => TargetMessage::Pong(data),
        Message::Close(frame) => TargetMessage::Close(frame.map(|f| TargetCloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.as_str().to_owned().into(),
        })),
    }
}

fn to_client_message(msg: TargetMessage) -> Option<Message> {
    match msg {
        TargetMessage::Text(text) => Some(Message::Text(text.as_str().into())),
        TargetMessage::Binary(data) => Some(Message::Binary(data)),
        TargetMessage::Ping(data) => Some(Message::Ping(data)),
        TargetMessage::Pong(data) => Some(Message::Pong(data)),
        TargetMessage::Close(frame) => Some(Message::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().into(),
        }))),
        // raw frames never surface with the default socket config
        TargetMessage::Frame(_) => None,
    }
}

async fn close_with(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    // the peer may already be gone; a second close is a no-op
    let _ = socket.send(Message::Close(Some(frame))).await;
}
