//! Popup Flow
//!
//! The terminal front end: resolve the current selection, collect a prompt,
//! dispatch to the backend, render the answer. Also hosts the capture
//! trigger that feeds the handoff slot from a desktop hotkey.

use anyhow::{bail, Result};
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::RelayError;
use crate::handoff::HandoffSlot;
use crate::ipc::IpcClient;
use crate::llm::LlmClient;
use crate::probe::SelectionProbe;
use crate::prompt::{build_payload, format_response, PromptMode};
use crate::relay::{Resolution, SelectionRelay};

/// Shown whenever resolution exhausts the ladder; never render silence.
pub const EMPTY_STATE: &str = "No text selected. Highlight some text and try again.";

#[derive(Debug, Default)]
pub struct PopupOptions {
    pub mode: Option<PromptMode>,
    pub prompt: Option<String>,
    pub copy: bool,
    pub watch: bool,
}

/// One popup session, start to finish.
pub async fn run_popup(mut config: Config, options: PopupOptions) -> Result<()> {
    let probe = Arc::new(SelectionProbe::from_config(&config));
    let relay = SelectionRelay::new(
        HandoffSlot::default_slot(),
        Box::new(IpcClient::new()),
        probe,
    );

    let resolution = relay.resolve().await;
    render_selection(&resolution);

    if options.watch {
        return watch_selection().await;
    }

    let mode = options.mode.unwrap_or(config.default_mode);
    if mode != config.default_mode {
        // Remember the chosen mode for next time
        config.default_mode = mode;
        if let Err(e) = config.save() {
            warn!("could not persist settings: {}", e);
        }
    }

    let prompt = match options.prompt {
        Some(prompt) => prompt,
        None => read_prompt()?,
    };

    let payload = match build_payload(mode, &config.system_prompt, &prompt, resolution.text()) {
        Ok(payload) => payload,
        Err(RelayError::Prompt(message)) => bail!(message),
        Err(e) => return Err(e.into()),
    };

    let client = LlmClient::from_config(&config)?;
    println!();
    println!("⏳ Waiting for the model...");

    let answer = client.complete(&payload).await?;
    let formatted = format_response(&answer);

    println!();
    println!("────────────────────────────────────────");
    println!("{}", formatted);
    println!("────────────────────────────────────────");

    if options.copy {
        if copy_to_clipboard(&formatted).await {
            println!("📋 Copied to clipboard");
        } else {
            warn!("could not copy the response to the clipboard");
        }
    }

    Ok(())
}

/// Capture trigger: grab the selection before any popup exists and park it
/// in the handoff slot. Sole writer of the slot.
pub async fn run_capture(config: Config) -> Result<()> {
    let client = IpcClient::new();
    let snapshot = match client.capture_now().await {
        Ok(Some(snapshot)) if snapshot.has_text() => snapshot,
        _ => {
            // No resident watcher; same probe, run here
            let probe = SelectionProbe::from_config(&config);
            probe.detect().await
        }
    };

    if !snapshot.has_text() {
        info!("nothing selected, handoff left untouched");
        println!("{}", EMPTY_STATE);
        return Ok(());
    }

    HandoffSlot::default_slot().store(&snapshot.text, snapshot.origin)?;
    println!(
        "✂️  Captured {} chars for the next popup",
        snapshot.text.chars().count()
    );
    Ok(())
}

fn render_selection(resolution: &Resolution) {
    match resolution {
        Resolution::Found { snapshot, via } => {
            println!("── selected text ({}) ──", via.label());
            println!("{}", snapshot.text);
        }
        Resolution::Unavailable => println!("{}", EMPTY_STATE),
        Resolution::Superseded => {}
    }
}

fn read_prompt() -> Result<String> {
    print!("Prompt> ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Stay subscribed and re-render as the selection moves.
async fn watch_selection() -> Result<()> {
    let client = IpcClient::new();
    let mut subscription = match client.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => bail!("cannot watch: {} (is the selrelay daemon running?)", e),
    };

    println!("Watching selection changes (Ctrl-C to stop)...");
    while let Some((text, _timestamp)) = subscription.next_change().await {
        if text.trim().is_empty() {
            println!("(selection cleared)");
        } else {
            println!("── selection ──");
            println!("{}", text);
        }
    }
    println!("Daemon went away, stopping watch.");
    Ok(())
}

fn clipboard_command() -> Option<(PathBuf, Vec<&'static str>)> {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        if let Ok(program) = which::which("wl-copy") {
            return Some((program, Vec::new()));
        }
    }
    if std::env::var_os("DISPLAY").is_some() {
        if let Ok(program) = which::which("xclip") {
            return Some((program, vec!["-i", "-selection", "clipboard"]));
        }
    }
    None
}

/// Best-effort copy via whichever clipboard tool the session has.
async fn copy_to_clipboard(text: &str) -> bool {
    let Some((program, args)) = clipboard_command() else {
        return false;
    };

    let child = Command::new(&program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(_) => return false,
    };

    if let Some(mut stdin) = child.stdin.take() {
        if stdin.write_all(text.as_bytes()).await.is_err() {
            return false;
        }
        drop(stdin);
    }

    matches!(child.wait().await, Ok(status) if status.success())
}
