//! IPC (Inter-Process Communication) Module
//!
//! Unix socket-based communication between the selrelay daemon and the
//! popup. Protocol: JSON over newline-delimited messages. Unknown message
//! kinds are ignored, not errors.

pub mod client;
pub mod messages;
pub mod server;

pub use client::{IpcClient, Subscription};
pub use messages::*;
pub use server::{IpcServer, ServerContext};

use std::path::PathBuf;

/// Requests and responses larger than this drop the connection
pub(crate) const MAX_LINE_BYTES: usize = 128 * 1024;

/// Get the Unix socket path for IPC
pub fn socket_path() -> PathBuf {
    if let Some(dir) = dirs::runtime_dir() {
        return dir.join("selrelay.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "selrelay".to_string());
    PathBuf::from(format!("/tmp/selrelay-{}.sock", user))
}
