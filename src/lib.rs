//! Forwarding HTTP/WebSocket relay proxy.
//!
//! Clients request `/proxy?url=<target>` (or upgrade a WebSocket on the
//! same path) and the relay fetches the target through one fixed,
//! authenticated upstream proxy, rewriting redirects and embedded HTML
//! links so every follow-on fetch routes back through the relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌────────────────────────────────────────────────┐
//!                       │                 RELAY PROXY                     │
//!                       │                                                 │
//!   /proxy?url=…        │  ┌────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ────────────────────┼─▶│  http  │──▶│ upstream │──▶│  upstream   │───┼──▶ destination
//!                       │  │ server │   │normalize │   │  dispatch   │   │    (via proxy)
//!                       │  └────────┘   └──────────┘   └──────┬──────┘   │
//!                       │                                     │          │
//!   response            │  ┌─────────────────────────┐        │          │
//!   ◀───────────────────┼──│ rewrite (redirect/html/ │◀───────┘          │
//!                       │  │ json/text/binary)       │                   │
//!                       │  └─────────────────────────┘                   │
//!                       │                                                 │
//!   ws upgrade          │  ┌──────────────────────────────────────────┐  │
//!   ────────────────────┼─▶│ websocket relay (CONNECT tunnel + frame  │──┼──▶ destination
//!                       │  │ forwarding, linked socket lifetimes)     │  │    socket
//!                       │  └──────────────────────────────────────────┘  │
//!                       │                                                 │
//!                       │  config (TOML + env) · tracing · static files   │
//!                       └────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod http;
pub mod rewrite;
pub mod upstream;

pub use config::RelayConfig;
pub use http::RelayServer;
