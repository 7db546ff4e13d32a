//! IPC Message Types
//!
//! JSON-serializable messages for popup ↔ daemon communication.

use serde::{Deserialize, Serialize};

use crate::snapshot::SelectionOrigin;

/// Request types sent from popup to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcRequest {
    /// Liveness check
    #[serde(rename = "ping")]
    Ping { seq_id: u64 },

    /// Fetch the watcher's last-known selection
    #[serde(rename = "get_selection")]
    GetSelection { seq_id: u64 },

    /// Liveness and a fresh probe in one round trip (handoff path)
    #[serde(rename = "capture_now")]
    CaptureNow { seq_id: u64 },

    /// Start receiving selection-changed events on this connection
    #[serde(rename = "subscribe")]
    Subscribe { seq_id: u64 },
}

/// Response types sent from daemon to popup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcResponse {
    /// Liveness answer
    #[serde(rename = "alive")]
    Alive { seq_id: u64 },

    /// A selection (possibly empty, with `origin` saying where it came from)
    #[serde(rename = "selection")]
    Selection {
        seq_id: u64,
        text: String,
        origin: SelectionOrigin,
    },

    /// Acknowledgment
    #[serde(rename = "ack")]
    Ack {
        seq_id: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Fire-and-forget push to subscribed connections
    #[serde(rename = "selection_changed")]
    SelectionChanged { text: String, timestamp: i64 },
}
