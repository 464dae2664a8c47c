//! push-hub server binary
//!
//! Run with: push-hub [--config push-hub.toml] [--bind 0.0.0.0:8080]
//!
//! Subscribe:
//!   curl -N 'http://localhost:8080/sse?userId=1&clientType=web&topics=news'
//!
//! Publish:
//!   curl -X POST localhost:8080/publishByTopic \
//!        -H 'content-type: application/json' \
//!        -d '{"topic":"news","message":"hello"}'

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use push_hub::{PushServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "push-hub", version, about = "Real-time SSE push hub")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config file
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match args.config {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    let config = match args.bind {
        Some(addr) => config.bind(addr),
        None => config,
    };

    let server = PushServer::new(config);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(addr = %server.bind_addr(), error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
