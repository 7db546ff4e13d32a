//! selrelay - Selection capture daemon
//!
//! Watches the desktop text selection and serves it to the popup over IPC.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use selrelay::config::Config;
use selrelay::feed::spawn_feeds;
use selrelay::ipc::{self, IpcServer, ServerContext};
use selrelay::probe::SelectionProbe;
use selrelay::watcher::{SelectionWatcher, WatcherSettings};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the IPC socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Override the poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("📎 selrelay v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load()?;
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }

    let probe = Arc::new(SelectionProbe::from_config(&config));

    // Event feeds nudge the watcher; the poll covers sessions without them
    let (event_tx, event_rx) = mpsc::channel(64);
    let feeds = spawn_feeds(event_tx);

    let (publish_tx, publish_rx) = mpsc::channel(16);
    let watcher = SelectionWatcher::spawn(
        probe.clone(),
        WatcherSettings::from_config(&config),
        event_rx,
        publish_tx,
    );

    let socket = args.socket.unwrap_or_else(ipc::socket_path);
    let server = IpcServer::start(
        socket,
        ServerContext {
            probe,
            store: watcher.store(),
        },
        publish_rx,
    )
    .await?;

    info!("✅ selrelay ready - highlight text, then open the popup");

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl-C, shutting down");

    feeds.stop();
    watcher.stop().await;
    server.shutdown().await;

    Ok(())
}
