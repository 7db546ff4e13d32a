//! Persisted Handoff
//!
//! A single-slot file that carries a selection captured out-of-band (the
//! capture hotkey) into the next popup open. At most one value is pending at
//! a time; the popup consumes it read-then-clear, exactly once.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{RelayError, RelayResult};
use crate::snapshot::SelectionOrigin;

#[derive(Debug, Serialize, Deserialize)]
struct HandoffRecord {
    text: String,
    origin: SelectionOrigin,
}

/// The single-slot handoff file.
pub struct HandoffSlot {
    path: PathBuf,
}

impl HandoffSlot {
    /// Slot in the user's runtime dir; falls back to /tmp like the socket.
    pub fn default_slot() -> Self {
        let path = match dirs::runtime_dir() {
            Some(dir) => dir.join("selrelay-handoff.json"),
            None => {
                let user = std::env::var("USER").unwrap_or_else(|_| "selrelay".to_string());
                PathBuf::from(format!("/tmp/selrelay-{}-handoff.json", user))
            }
        };
        Self { path }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store a value, replacing whatever was pending. Text that trims down
    /// to nothing clears the slot instead; the slot never holds whitespace.
    pub fn store(&self, text: &str, origin: SelectionOrigin) -> RelayResult<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return self.clear();
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let record = HandoffRecord {
            text: trimmed.to_string(),
            origin,
        };
        let content = serde_json::to_string(&record)?;

        // Write-then-rename so a concurrent take never sees a torn record
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| RelayError::Handoff(format!("failed to publish handoff: {}", e)))?;
        debug!("handoff stored ({} bytes)", trimmed.len());
        Ok(())
    }

    /// Consume the pending value, if any. The slot is cleared even when the
    /// record is unreadable, so a corrupt file cannot wedge the popup.
    pub fn take(&self) -> RelayResult<Option<(String, SelectionOrigin)>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        self.clear()?;

        match serde_json::from_str::<HandoffRecord>(&content) {
            Ok(record) if !record.text.trim().is_empty() => {
                Ok(Some((record.text.trim().to_string(), record.origin)))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                debug!("discarding unreadable handoff: {}", e);
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> RelayResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
