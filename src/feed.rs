//! Selection Event Feeds
//!
//! Push-style notifications that the selection may have changed, fed into
//! the watcher alongside its poll. Wayland sessions get them from
//! `wl-paste --watch`, X11 sessions from a `clipnotify` loop. Feeds are an
//! optimization for responsiveness; the watcher's poll remains the
//! correctness backstop when neither tool is installed.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A nudge from the desktop that the selection may have moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// Probe right away (the change has already settled)
    Immediate,
    /// Debounce briefly before probing (the change may still be in flight)
    Settled,
}

struct FeedHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

/// The set of running feeds for one watcher.
pub struct FeedSet {
    feeds: Vec<FeedHandle>,
}

impl FeedSet {
    pub fn names(&self) -> Vec<&'static str> {
        self.feeds.iter().map(|f| f.name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Stop every feed. Child processes are killed with their tasks.
    pub fn stop(&self) {
        for feed in &self.feeds {
            feed.task.abort();
        }
    }
}

impl Drop for FeedSet {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start whichever feeds this session supports.
pub fn spawn_feeds(tx: mpsc::Sender<WatchEvent>) -> FeedSet {
    let mut feeds = Vec::new();

    if let Some(program) = wayland_watch_program() {
        feeds.push(FeedHandle {
            name: "wayland-watch",
            task: tokio::spawn(wayland_watch(program, tx.clone())),
        });
    }

    if let Some(program) = x11_notify_program() {
        feeds.push(FeedHandle {
            name: "x11-clipnotify",
            task: tokio::spawn(x11_notify(program, tx)),
        });
    }

    let set = FeedSet { feeds };
    if set.is_empty() {
        info!("no selection event feeds available, relying on poll only");
    } else {
        info!("selection event feeds: {:?}", set.names());
    }
    set
}

fn wayland_watch_program() -> Option<PathBuf> {
    if std::env::var_os("WAYLAND_DISPLAY").is_none() {
        return None;
    }
    which::which("wl-paste").ok()
}

fn x11_notify_program() -> Option<PathBuf> {
    if std::env::var_os("DISPLAY").is_none() {
        return None;
    }
    which::which("clipnotify").ok()
}

/// `wl-paste --watch` runs its command once per selection change; each run
/// prints one marker line, which we translate into an event.
async fn wayland_watch(program: PathBuf, tx: mpsc::Sender<WatchEvent>) {
    let child = Command::new(&program)
        .args(["--primary", "--watch", "echo", "selection"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            debug!("wayland feed failed to start: {}", e);
            return;
        }
    };

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => return,
    };

    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(_)) => {
                if tx.send(WatchEvent::Immediate).await.is_err() {
                    // Watcher gone; the child dies with this task
                    break;
                }
            }
            Ok(None) => {
                debug!("wayland feed ended");
                break;
            }
            Err(e) => {
                debug!("wayland feed read error: {}", e);
                break;
            }
        }
    }
}

/// `clipnotify` exits once per selection event, so the feed re-runs it in a
/// loop. Its exits slightly precede the buffer settling, hence `Settled`.
async fn x11_notify(program: PathBuf, tx: mpsc::Sender<WatchEvent>) {
    loop {
        let status = Command::new(&program)
            .args(["-s", "primary"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => {
                if tx.send(WatchEvent::Settled).await.is_err() {
                    break;
                }
            }
            Ok(status) => {
                debug!("x11 feed exited with {}, stopping", status);
                break;
            }
            Err(e) => {
                debug!("x11 feed failed: {}", e);
                break;
            }
        }
    }
}
