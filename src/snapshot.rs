//! Selection Snapshots
//!
//! Point-in-time captures of the desktop text selection. A snapshot is the
//! single unit of data that crosses every boundary in selrelay: watcher to
//! IPC server, daemon to popup, popup to prompt builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a selection was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrigin {
    /// Wayland primary selection (wl-paste)
    WaylandPrimary,
    /// X11 primary selection (xclip)
    X11Primary,
    /// User-configured source command
    Command,
    /// No selection anywhere
    None,
}

impl SelectionOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionOrigin::WaylandPrimary => "wayland primary",
            SelectionOrigin::X11Primary => "x11 primary",
            SelectionOrigin::Command => "source command",
            SelectionOrigin::None => "none",
        }
    }
}

/// Best current guess at "what the user has highlighted".
///
/// Invariants: `text` is always trimmed; an empty capture is represented as
/// `origin == None` with an empty string, never as whitespace. Snapshots are
/// recomputed wholesale and superseded, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub text: String,
    pub captured_at: DateTime<Utc>,
    pub origin: SelectionOrigin,
}

impl SelectionSnapshot {
    /// A capture from a concrete source. Trims the text; a capture that trims
    /// down to nothing collapses to the empty snapshot.
    pub fn captured(text: &str, origin: SelectionOrigin) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::none();
        }
        Self {
            text: trimmed.to_string(),
            captured_at: Utc::now(),
            origin,
        }
    }

    /// The explicit "no selection" snapshot.
    pub fn none() -> Self {
        Self {
            text: String::new(),
            captured_at: Utc::now(),
            origin: SelectionOrigin::None,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Change-detection equality: text only, never timestamps. An empty
    /// string and the `None` origin are the same "no selection" state.
    pub fn same_text(&self, other: &SelectionSnapshot) -> bool {
        self.text == other.text
    }
}

impl Default for SelectionSnapshot {
    fn default() -> Self {
        Self::none()
    }
}
