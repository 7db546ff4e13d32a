//! IPC Client
//!
//! Popup-side Unix socket client. One short-lived connection per request,
//! plus a long-lived subscription stream for live selection updates.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::{socket_path, IpcRequest, IpcResponse, MAX_LINE_BYTES};
use crate::error::{RelayError, RelayResult};
use crate::snapshot::{SelectionOrigin, SelectionSnapshot};

/// Quick round trips; a daemon that cannot answer this fast counts as absent
const PING_TIMEOUT: Duration = Duration::from_millis(300);

/// Round trips that may run a probe on the daemon side
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

static NEXT_SEQ_ID: AtomicU64 = AtomicU64::new(1);

fn next_seq_id() -> u64 {
    NEXT_SEQ_ID.fetch_add(1, Ordering::SeqCst)
}

/// IPC Client for the popup
pub struct IpcClient {
    path: PathBuf,
}

impl IpcClient {
    pub fn new() -> Self {
        Self {
            path: socket_path(),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Liveness check against the resident daemon.
    pub async fn ping(&self) -> bool {
        let seq_id = next_seq_id();
        match self
            .round_trip(&IpcRequest::Ping { seq_id }, PING_TIMEOUT)
            .await
        {
            Ok(IpcResponse::Alive { seq_id: resp_seq }) => {
                if resp_seq != seq_id {
                    warn!("⚠️ IPC sequence ID mismatch on ping");
                    return false;
                }
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!("ping failed: {}", e);
                false
            }
        }
    }

    /// Fetch the watcher's last-known selection.
    pub async fn get_selection(&self) -> RelayResult<Option<SelectionSnapshot>> {
        self.fetch_selection(|seq_id| IpcRequest::GetSelection { seq_id })
            .await
    }

    /// Ask the daemon for a fresh probe (liveness + fetch in one trip).
    pub async fn capture_now(&self) -> RelayResult<Option<SelectionSnapshot>> {
        self.fetch_selection(|seq_id| IpcRequest::CaptureNow { seq_id })
            .await
    }

    async fn fetch_selection(
        &self,
        make_request: impl FnOnce(u64) -> IpcRequest,
    ) -> RelayResult<Option<SelectionSnapshot>> {
        let seq_id = next_seq_id();
        let response = self
            .round_trip(&make_request(seq_id), REQUEST_TIMEOUT)
            .await?;

        match response {
            IpcResponse::Selection {
                seq_id: resp_seq,
                text,
                origin,
            } => {
                if resp_seq != seq_id {
                    warn!("⚠️ IPC sequence ID mismatch: expected {}, got {}", seq_id, resp_seq);
                    return Ok(None);
                }
                Ok(Some(rebuild_snapshot(text, origin)))
            }
            _ => {
                warn!("Unexpected IPC response type");
                Ok(None)
            }
        }
    }

    /// Open a long-lived connection that yields selection-changed events.
    pub async fn subscribe(&self) -> RelayResult<Subscription> {
        let stream = tokio::time::timeout(PING_TIMEOUT, UnixStream::connect(&self.path))
            .await
            .map_err(|_| RelayError::Ipc("daemon connect timed out".to_string()))??;
        let (read_half, mut write_half) = stream.into_split();

        let seq_id = next_seq_id();
        let request = serde_json::to_string(&IpcRequest::Subscribe { seq_id })? + "\n";
        write_half.write_all(request.as_bytes()).await?;

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        tokio::time::timeout(REQUEST_TIMEOUT, reader.read_line(&mut line))
            .await
            .map_err(|_| RelayError::Ipc("subscribe timed out".to_string()))??;

        match serde_json::from_str::<IpcResponse>(line.trim()) {
            Ok(IpcResponse::Ack { success: true, .. }) => Ok(Subscription {
                reader,
                _write_half: write_half,
            }),
            _ => Err(RelayError::Ipc("subscribe rejected".to_string())),
        }
    }

    async fn round_trip(
        &self,
        request: &IpcRequest,
        timeout: Duration,
    ) -> RelayResult<IpcResponse> {
        let work = async {
            let stream = UnixStream::connect(&self.path).await?;
            let (read_half, mut write_half) = stream.into_split();

            let payload = serde_json::to_string(request)? + "\n";
            write_half.write_all(payload.as_bytes()).await?;

            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(RelayError::Ipc("daemon closed the connection".to_string()));
            }
            if line.len() > MAX_LINE_BYTES {
                return Err(RelayError::Ipc("response over size cap".to_string()));
            }

            let response: IpcResponse = serde_json::from_str(line.trim())?;
            debug!("📨 IPC response: {:?}", response);
            Ok(response)
        };

        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| RelayError::Ipc("daemon did not respond in time".to_string()))?
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A live event stream from the daemon.
pub struct Subscription {
    reader: BufReader<OwnedReadHalf>,
    _write_half: OwnedWriteHalf,
}

impl Subscription {
    /// Next selection-changed event, or `None` once the daemon goes away.
    /// Anything that is not a selection-changed push is skipped.
    pub async fn next_change(&mut self) -> Option<(String, i64)> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line).await {
                Ok(0) => return None,
                Ok(_) => match serde_json::from_str::<IpcResponse>(line.trim()) {
                    Ok(IpcResponse::SelectionChanged { text, timestamp }) => {
                        return Some((text, timestamp))
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("ignoring unrecognized push: {}", e);
                        continue;
                    }
                },
                Err(e) => {
                    debug!("subscription read error: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Snapshots cross the socket as plain data; re-establish the invariants on
/// the way back in.
fn rebuild_snapshot(text: String, origin: SelectionOrigin) -> SelectionSnapshot {
    if text.trim().is_empty() {
        SelectionSnapshot::none()
    } else {
        SelectionSnapshot::captured(&text, origin)
    }
}
