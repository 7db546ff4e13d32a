//! selrelay Popup - terminal front end
//!
//! Run with: cargo run --bin selrelay-popup

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use selrelay::config::Config;
use selrelay::popup::{self, PopupOptions};
use selrelay::prompt::PromptMode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Prompt to send (read interactively when omitted)
    #[arg(short, long)]
    prompt: Option<String>,

    /// write: generate new content; rewrite: improve the selection
    #[arg(short, long, value_enum)]
    mode: Option<PromptMode>,

    /// Copy the response to the clipboard
    #[arg(long)]
    copy: bool,

    /// Stream selection changes instead of sending a request
    #[arg(long)]
    watch: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture the current selection into the handoff slot (bind to a hotkey)
    Capture,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The popup prints to the terminal; keep logs out of the way by default
    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load()?;

    match args.command {
        Some(Commands::Capture) => popup::run_capture(config).await,
        None => {
            popup::run_popup(
                config,
                PopupOptions {
                    mode: args.mode,
                    prompt: args.prompt,
                    copy: args.copy,
                    watch: args.watch,
                },
            )
            .await
        }
    }
}
