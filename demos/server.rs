//! Notes server demo
//!
//! Run with: cargo run --example notes_server -- [OPTIONS]
//!
//! Examples:
//!   cargo run --example notes_server                         # binds to 0.0.0.0:50051
//!   cargo run --example notes_server -- --bind 127.0.0.1:6000
//!   cargo run --example notes_server -- --config notes.toml
//!   NOTES_AUTH_TOKEN=secret cargo run --example notes_server
//!
//! Connect with the `chat_client` demo.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use notes_rt::logging::{self, LogFormat};
use notes_rt::{NotesServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "notes_server", about = "Realtime notes server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Bearer token accepted for note calls
    #[arg(long, env = "NOTES_AUTH_TOKEN")]
    token: Option<String>,

    /// Log filter directive
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Print how many streams are open every N seconds
    #[arg(long, default_value_t = 30)]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default().with_env_overrides()?,
    };
    if let Some(addr) = args.bind {
        config = config.bind(addr);
    }
    if let Some(token) = args.token {
        config.auth_token = Some(token);
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }

    logging::init(&config.log_level, config.log_format);

    let server = NotesServer::new(config);

    let hub = server.hub().clone();
    let shutdown = server.shutdown_token();
    let interval = Duration::from_secs(args.stats_interval.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let stats = hub.stats();
                    tracing::info!(
                        subscribers = stats.subscriber_count,
                        published = stats.published,
                        "Hub stats"
                    );
                }
            }
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let stats = server.stats();
    println!(
        "Served {} connections ({} rejected)",
        stats.total_connections, stats.rejected_connections
    );
    Ok(())
}
