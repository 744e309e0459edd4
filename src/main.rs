//! relay-proxy startup binary.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_proxy::config::validation::validate_config;
use relay_proxy::config::{load_config, ConfigError};
use relay_proxy::http::RelayServer;

#[derive(Parser)]
#[clap(
    version,
    about = "Forwarding HTTP/WebSocket proxy that relays through a fixed upstream proxy"
)]
struct Args {
    #[clap(short, long, value_name = "FILE", help = "Configuration file path (TOML)")]
    config: Option<PathBuf>,

    #[clap(short, long, value_name = "ADDR", help = "Listen address (e.g., 127.0.0.1:8080)")]
    listen: Option<String>,

    #[clap(long, value_name = "DIR", help = "Serve static files from this directory")]
    static_dir: Option<String>,

    #[clap(
        long,
        value_name = "CRED",
        help = "Upstream proxy credential (username:password@host:port)"
    )]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_proxy=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Some(dir) = args.static_dir {
        config.static_files.root_dir = dir;
        config.static_files.enabled = true;
    }
    if let Some(credential) = args.upstream {
        config.upstream.credential = Some(credential);
    }

    // A missing or malformed upstream credential must stop the process
    // here, not surface per-request.
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(%error, "invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        static_files = config.static_files.enabled,
        request_timeout_secs = config.upstream.request_timeout_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = RelayServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
