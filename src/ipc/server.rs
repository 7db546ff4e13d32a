//! IPC Server
//!
//! Daemon-side Unix socket server. Answers popup requests against the
//! watcher's shared state and fans selection-changed events out to
//! subscribed connections. A subscriber that stops reading is dropped
//! silently; pushes have no delivery guarantee.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{IpcRequest, IpcResponse, MAX_LINE_BYTES};
use crate::error::RelayResult;
use crate::probe::SelectionProbe;
use crate::snapshot::SelectionSnapshot;
use crate::watcher::SharedSnapshot;

/// What connections need to answer requests
pub struct ServerContext {
    pub probe: Arc<SelectionProbe>,
    pub store: SharedSnapshot,
}

/// IPC Server for the daemon
pub struct IpcServer {
    path: PathBuf,
    accept_task: JoinHandle<()>,
    hub_task: JoinHandle<()>,
}

impl IpcServer {
    /// Bind the socket and start serving.
    pub async fn start(
        path: PathBuf,
        context: ServerContext,
        mut events: mpsc::Receiver<SelectionSnapshot>,
    ) -> RelayResult<Self> {
        // Clean up stale socket
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&path)?;

        // User-only permissions; the socket carries selection contents
        if let Ok(metadata) = std::fs::metadata(&path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&path, perms) {
                warn!("⚠️ Failed to set strict IPC socket permissions: {}", e);
            }
        }

        info!("🔌 IPC server listening on {:?}", path);

        let (broadcast_tx, _) = broadcast::channel::<SelectionSnapshot>(16);

        // Hub: watcher publishes into `events`; subscribers hang off the
        // broadcast side. A send with no subscribers is a normal drop.
        let hub_broadcast = broadcast_tx.clone();
        let hub_task = tokio::spawn(async move {
            while let Some(snapshot) = events.recv().await {
                let _ = hub_broadcast.send(snapshot);
            }
            debug!("watcher publish channel ended");
        });

        let context = Arc::new(context);
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let ctx = context.clone();
                        let events = broadcast_tx.clone();
                        tokio::spawn(async move {
                            handle_client(stream, ctx, events).await;
                        });
                    }
                    Err(e) => {
                        warn!("IPC accept error: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
        });

        Ok(Self {
            path,
            accept_task,
            hub_task,
        })
    }

    /// Stop serving and remove the socket file.
    pub async fn shutdown(self) {
        self.accept_task.abort();
        self.hub_task.abort();
        let _ = self.accept_task.await;
        let _ = self.hub_task.await;
        let _ = std::fs::remove_file(&self.path);
        info!("🔌 IPC server stopped");
    }
}

/// Serve one connection until it closes or misbehaves.
async fn handle_client(
    stream: UnixStream,
    context: Arc<ServerContext>,
    events: broadcast::Sender<SelectionSnapshot>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let mut subscription: Option<broadcast::Receiver<SelectionSnapshot>> = None;

    loop {
        line.clear();

        let request = tokio::select! {
            result = reader.read_line(&mut line) => {
                match result {
                    Ok(0) => return,
                    Ok(_) => {
                        if line.len() > MAX_LINE_BYTES {
                            warn!("IPC request over size cap, dropping connection");
                            return;
                        }
                        match serde_json::from_str::<IpcRequest>(line.trim()) {
                            Ok(request) => Some(request),
                            Err(e) => {
                                // Unknown or malformed kinds are ignored
                                debug!("ignoring unrecognized IPC message: {}", e);
                                None
                            }
                        }
                    }
                    Err(e) => {
                        debug!("IPC read error: {}", e);
                        return;
                    }
                }
            }
            event = async { subscription.as_mut().unwrap().recv().await }, if subscription.is_some() => {
                match event {
                    Ok(snapshot) => {
                        let push = IpcResponse::SelectionChanged {
                            text: snapshot.text,
                            timestamp: snapshot.captured_at.timestamp_millis(),
                        };
                        if write_response(&mut write_half, &push).await.is_err() {
                            // Subscriber went away; nothing to do
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        subscription = None;
                    }
                }
                None
            }
        };

        let Some(request) = request else { continue };
        debug!("📨 IPC request: {:?}", request);

        let response = match request {
            IpcRequest::Ping { seq_id } => IpcResponse::Alive { seq_id },
            IpcRequest::GetSelection { seq_id } => {
                let snapshot = context.store.get().await;
                IpcResponse::Selection {
                    seq_id,
                    text: snapshot.text,
                    origin: snapshot.origin,
                }
            }
            IpcRequest::CaptureNow { seq_id } => {
                // Fresh probe: a pull is authoritative over stale pushed state
                let snapshot = context.probe.detect().await;
                IpcResponse::Selection {
                    seq_id,
                    text: snapshot.text,
                    origin: snapshot.origin,
                }
            }
            IpcRequest::Subscribe { seq_id } => {
                subscription = Some(events.subscribe());
                IpcResponse::Ack {
                    seq_id,
                    success: true,
                    message: None,
                }
            }
        };

        if write_response(&mut write_half, &response).await.is_err() {
            return;
        }
    }
}

async fn write_response(
    write_half: &mut tokio::net::unix::OwnedWriteHalf,
    response: &IpcResponse,
) -> std::io::Result<()> {
    let mut payload = match serde_json::to_string(response) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("failed to encode IPC response: {}", e);
            return Ok(());
        }
    };
    payload.push('\n');
    write_half.write_all(payload.as_bytes()).await
}
