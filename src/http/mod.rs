//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, route + static fallback)
//!     → relay.rs (normalize → dispatch → classify → send)
//!     → websocket.rs (upgrade → tunnel → bidirectional frame relay)
//! ```

pub mod relay;
pub mod server;
pub mod websocket;

pub use server::{AppState, RelayServer, ServerError};
