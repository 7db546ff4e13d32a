//! Selection Watcher
//!
//! The daemon's resident observer. Recomputes the selection snapshot on
//! event-feed nudges and on a periodic poll, detects changes by text
//! equality, keeps the last-known snapshot readable for the IPC layer, and
//! publishes changes best-effort. When the publish channel is gone the
//! watcher shuts itself down rather than polling into the void.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::Config;
use crate::feed::WatchEvent;
use crate::probe::SelectionProbe;
use crate::snapshot::SelectionSnapshot;

/// Watcher timing knobs
#[derive(Debug, Clone, Copy)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl WatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }
}

/// Last-known snapshot, shared between the watcher and the IPC server.
#[derive(Clone, Default)]
pub struct SharedSnapshot(Arc<RwLock<SelectionSnapshot>>);

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> SelectionSnapshot {
        self.0.read().await.clone()
    }

    async fn set(&self, snapshot: SelectionSnapshot) {
        *self.0.write().await = snapshot;
    }
}

/// Running watcher; dropping the handle does not stop the task, `stop` does.
pub struct WatcherHandle {
    task: JoinHandle<()>,
    store: SharedSnapshot,
}

impl WatcherHandle {
    pub fn store(&self) -> SharedSnapshot {
        self.store.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Spawns and owns the observation loop.
pub struct SelectionWatcher;

impl SelectionWatcher {
    pub fn spawn(
        probe: Arc<SelectionProbe>,
        settings: WatcherSettings,
        events: mpsc::Receiver<WatchEvent>,
        publish: mpsc::Sender<SelectionSnapshot>,
    ) -> WatcherHandle {
        let store = SharedSnapshot::new();
        let task = tokio::spawn(run_loop(
            probe,
            settings,
            events,
            publish,
            store.clone(),
        ));
        WatcherHandle { task, store }
    }
}

async fn run_loop(
    probe: Arc<SelectionProbe>,
    settings: WatcherSettings,
    mut events: mpsc::Receiver<WatchEvent>,
    publish: mpsc::Sender<SelectionSnapshot>,
    store: SharedSnapshot,
) {
    let mut poll = tokio::time::interval(settings.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last = SelectionSnapshot::none();
    let mut events_open = true;

    loop {
        tokio::select! {
            event = events.recv(), if events_open => {
                match event {
                    Some(WatchEvent::Settled) => {
                        // Let the native selection settle, then coalesce the burst
                        tokio::time::sleep(settings.debounce).await;
                        while events.try_recv().is_ok() {}
                    }
                    Some(WatchEvent::Immediate) => {}
                    None => {
                        debug!("event feeds closed, continuing on poll alone");
                        events_open = false;
                        continue;
                    }
                }
            }
            _ = poll.tick() => {}
        }

        let snapshot = probe.detect().await;
        if last.same_text(&snapshot) {
            continue;
        }

        debug!(
            "selection changed via {} ({} chars)",
            snapshot.origin.label(),
            snapshot.text.chars().count()
        );
        last = snapshot.clone();
        store.set(snapshot.clone()).await;

        if publish.send(snapshot).await.is_err() {
            // Nobody left to publish to: stop the timers with us
            info!("publish channel closed, selection watcher stopping");
            break;
        }
    }
}
