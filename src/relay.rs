//! Selection Relay
//!
//! Popup-side resolution of "what is selected right now". Tries, in order:
//! the persisted handoff slot, the resident watcher over IPC, and finally a
//! one-shot run of the shared probe. Each step runs only if the previous one
//! produced no usable text. The newest resolve operation is authoritative; a
//! superseded one reports that instead of a stale answer.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::RelayResult;
use crate::handoff::HandoffSlot;
use crate::ipc::IpcClient;
use crate::probe::SelectionProbe;
use crate::snapshot::SelectionSnapshot;

/// The watcher as seen from the popup. Abstracted so resolution can be
/// exercised without a live daemon.
#[async_trait]
pub trait WatcherLink: Send + Sync {
    async fn ping(&self) -> bool;
    async fn last_selection(&self) -> RelayResult<Option<SelectionSnapshot>>;
}

#[async_trait]
impl WatcherLink for IpcClient {
    async fn ping(&self) -> bool {
        IpcClient::ping(self).await
    }

    async fn last_selection(&self) -> RelayResult<Option<SelectionSnapshot>> {
        self.get_selection().await
    }
}

/// Which ladder step produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Handoff,
    Watcher,
    DirectProbe,
}

impl ResolvedVia {
    pub fn label(&self) -> &'static str {
        match self {
            ResolvedVia::Handoff => "captured earlier",
            ResolvedVia::Watcher => "watcher",
            ResolvedVia::DirectProbe => "direct probe",
        }
    }
}

/// Outcome of one resolve operation
#[derive(Debug, Clone)]
pub enum Resolution {
    Found {
        snapshot: SelectionSnapshot,
        via: ResolvedVia,
    },
    /// Every step came up empty; callers must render a visible empty state
    Unavailable,
    /// A newer resolve took over; this result must not be acted on
    Superseded,
}

impl Resolution {
    pub fn text(&self) -> Option<&str> {
        match self {
            Resolution::Found { snapshot, .. } => Some(snapshot.text.as_str()),
            _ => None,
        }
    }
}

/// Resolves the current selection for the popup.
pub struct SelectionRelay {
    handoff: HandoffSlot,
    link: Box<dyn WatcherLink>,
    probe: Arc<SelectionProbe>,
    generation: AtomicU64,
}

impl SelectionRelay {
    pub fn new(handoff: HandoffSlot, link: Box<dyn WatcherLink>, probe: Arc<SelectionProbe>) -> Self {
        Self {
            handoff,
            link,
            probe,
            generation: AtomicU64::new(0),
        }
    }

    /// Run the fallback ladder once. Called on popup open and on refresh.
    pub async fn resolve(&self) -> Resolution {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Step 1: a selection captured before the popup existed wins outright
        debug!("resolve: checking handoff");
        if let Ok(Some((text, origin))) = self.handoff.take() {
            let snapshot = SelectionSnapshot::captured(&text, origin);
            if snapshot.has_text() {
                return Resolution::Found {
                    snapshot,
                    via: ResolvedVia::Handoff,
                };
            }
        }

        // Step 2: ask the resident watcher
        debug!("resolve: probing watcher");
        if self.link.ping().await {
            if self.is_superseded(generation) {
                return Resolution::Superseded;
            }
            match self.link.last_selection().await {
                Ok(Some(snapshot)) if snapshot.has_text() => {
                    if self.is_superseded(generation) {
                        return Resolution::Superseded;
                    }
                    return Resolution::Found {
                        snapshot,
                        via: ResolvedVia::Watcher,
                    };
                }
                Ok(_) => {}
                Err(e) => debug!("watcher fetch failed: {}", e),
            }
        }
        if self.is_superseded(generation) {
            return Resolution::Superseded;
        }

        // Step 3: no watcher (or nothing from it) - probe directly
        debug!("resolve: direct probe");
        let snapshot = self.probe.detect().await;
        if self.is_superseded(generation) {
            return Resolution::Superseded;
        }

        if snapshot.has_text() {
            Resolution::Found {
                snapshot,
                via: ResolvedVia::DirectProbe,
            }
        } else {
            Resolution::Unavailable
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}
