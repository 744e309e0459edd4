//! Shared utilities for integration testing.
//!
//! The relay only ever talks to the network through its upstream proxy, so
//! the central piece here is a mock proxy: absolute-form HTTP requests get
//! canned responses keyed by target path, CONNECT requests are tunneled to
//! the requested address (which lets WebSocket targets run locally).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use relay_proxy::config::RelayConfig;
use relay_proxy::http::RelayServer;

pub const PROXY_USER: &str = "test";
pub const PROXY_PASS: &str = "secret";
/// base64 of "test:secret"
const PROXY_AUTH: &str = "Basic dGVzdDpzZWNyZXQ=";

/// Start the relay under test against the given upstream proxy address.
pub async fn spawn_relay(upstream: SocketAddr) -> SocketAddr {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.credential = Some(format!(
        "{PROXY_USER}:{PROXY_PASS}@{}:{}",
        upstream.ip(),
        upstream.port()
    ));
    config.static_files.enabled = false;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = RelayServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

/// Start the mock upstream proxy. Returns its address and a counter of
/// forwarded (non-CONNECT) dispatches.
pub async fn start_upstream_proxy() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let counter = counter.clone();
            tokio::spawn(async move {
                let _ = handle_proxy_connection(stream, counter).await;
            });
        }
    });

    (addr, hits)
}

async fn handle_proxy_connection(
    mut stream: TcpStream,
    hits: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    let (head, mut body) = read_head(&mut stream).await?;
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default().to_string();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    if !head_has_auth(&head) {
        let response = http_response(407, "text/plain", &[], b"proxy auth required");
        stream.write_all(&response).await?;
        return stream.shutdown().await;
    }

    if method == "CONNECT" {
        let mut upstream = TcpStream::connect(&target).await?;
        stream
            .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
            .await?;
        let _ = tokio::io::copy_bidirectional(&mut stream, &mut upstream).await;
        return Ok(());
    }

    // absolute-form dispatch: finish reading the body, then answer canned
    let content_length = header_value(&head, "content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    while body.len() < content_length {
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    hits.fetch_add(1, Ordering::SeqCst);

    let url = Url::parse(&target).expect("mock proxy received a non-absolute target");
    let path = url.path().to_string();
    let query = url.query().unwrap_or("").to_string();

    let response = match path.as_str() {
        "/html" => http_response(
            200,
            "text/html; charset=utf-8",
            &[],
            concat!(
                "<html><head><title>t</title></head>",
                r#"<body><a href="/b">b</a><a href="https://other.com/x">x</a></body></html>"#
            )
            .as_bytes(),
        ),
        "/redirect" => http_response(302, "text/plain", &[("Location", "/new")], b""),
        "/json" => http_response(200, "application/json", &[], br#"{"ok":true}"#),
        "/bad-json" => http_response(200, "application/json", &[], b"{not json"),
        "/bin" => http_response(200, "application/octet-stream", &[], &[0x00, 0xff, 0x10, 0x80]),
        "/echo-headers" => http_response(200, "text/plain", &[], head.as_bytes()),
        "/echo-query" => http_response(200, "text/plain", &[], query.as_bytes()),
        "/echo-body" => http_response(200, "text/plain", &[], &body),
        p if p.starts_with("/page/") => http_response(200, "text/plain", &[], p.as_bytes()),
        _ => http_response(404, "text/plain", &[], b"not found"),
    };

    stream.write_all(&response).await?;
    stream.shutdown().await
}

/// Echo WebSocket server. Echoes text and binary frames; the text frame
/// "bye" makes the server close first. The returned flag flips once the
/// server side of a connection has ended.
#[allow(dead_code)]
pub async fn start_ws_echo() -> (SocketAddr, Arc<AtomicBool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let closed = Arc::new(AtomicBool::new(false));
    let flag = closed.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let flag = flag.clone();
            tokio::spawn(async move {
                use tokio_tungstenite::tungstenite::Message;

                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    flag.store(true, Ordering::SeqCst);
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Text(text) => {
                            if text.as_str() == "bye" {
                                let _ = ws.close(None).await;
                                break;
                            }
                            if ws.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Message::Binary(data) => {
                            if ws.send(Message::Binary(data)).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                flag.store(true, Ordering::SeqCst);
            });
        }
    });

    (addr, closed)
}

async fn read_head(stream: &mut TcpStream) -> std::io::Result<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            let rest = buf[pos + 4..].to_vec();
            return Ok((head, rest));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before end of headers",
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

fn head_has_auth(head: &str) -> bool {
    header_value(head, "proxy-authorization") == Some(PROXY_AUTH)
}

fn http_response(status: u16, content_type: &str, extra: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        407 => "Proxy Authentication Required",
        _ => "OK",
    };
    let mut head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in extra {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}
