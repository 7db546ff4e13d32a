//! Selection Sources
//!
//! The distinct places a text selection can live on a Linux desktop. Each
//! source is one rung of the probe ladder; the probe tries them in order and
//! takes the first non-empty result. A source that fails is skipped, never
//! fatal.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{RelayError, RelayResult};
use crate::snapshot::SelectionOrigin;

/// How long a single source command may run before it is abandoned
const SOURCE_TIMEOUT: Duration = Duration::from_millis(500);

/// Captures larger than this are truncated at a char boundary
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// One place a selection can be read from.
///
/// `read` returns `Ok(None)` when the source is reachable but holds no
/// selection, and `Err` for any fault (missing tool, timeout, bad output).
/// Callers treat both the same way: move on to the next source.
#[async_trait]
pub trait SelectionSource: Send + Sync {
    fn name(&self) -> &str;
    fn origin(&self) -> SelectionOrigin;
    async fn read(&self) -> RelayResult<Option<String>>;
}

/// Run a capture command and collect its stdout.
///
/// A non-zero exit is "no selection" (wl-paste and xclip both exit non-zero
/// when the buffer is empty); spawn failures, timeouts and non-UTF-8 output
/// are faults.
async fn run_capture(program: &PathBuf, args: &[String]) -> RelayResult<Option<String>> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(SOURCE_TIMEOUT, child)
        .await
        .map_err(|_| RelayError::Source(format!("{} timed out", program.display())))?
        .map_err(|e| RelayError::Source(format!("{}: {}", program.display(), e)))?;

    if !output.status.success() {
        return Ok(None);
    }

    let mut text = String::from_utf8(output.stdout)
        .map_err(|_| RelayError::Source(format!("{}: non-UTF-8 output", program.display())))?;

    if text.len() > MAX_CAPTURE_BYTES {
        let mut end = MAX_CAPTURE_BYTES;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        debug!("capture truncated to {} bytes", end);
    }

    Ok(Some(text))
}

/// Wayland primary selection via wl-paste
pub struct WaylandPrimarySource {
    program: PathBuf,
}

impl WaylandPrimarySource {
    /// Present only when a Wayland session is up and wl-paste is installed.
    pub fn from_env() -> Option<Self> {
        if std::env::var_os("WAYLAND_DISPLAY").is_none() {
            return None;
        }
        let program = which::which("wl-paste").ok()?;
        Some(Self { program })
    }
}

#[async_trait]
impl SelectionSource for WaylandPrimarySource {
    fn name(&self) -> &str {
        "wayland-primary"
    }

    fn origin(&self) -> SelectionOrigin {
        SelectionOrigin::WaylandPrimary
    }

    async fn read(&self) -> RelayResult<Option<String>> {
        let args = vec!["--primary".to_string(), "--no-newline".to_string()];
        run_capture(&self.program, &args).await
    }
}

/// X11 primary selection via xclip
pub struct X11PrimarySource {
    program: PathBuf,
}

impl X11PrimarySource {
    /// Present only when an X session is up and xclip is installed.
    pub fn from_env() -> Option<Self> {
        if std::env::var_os("DISPLAY").is_none() {
            return None;
        }
        let program = which::which("xclip").ok()?;
        Some(Self { program })
    }
}

#[async_trait]
impl SelectionSource for X11PrimarySource {
    fn name(&self) -> &str {
        "x11-primary"
    }

    fn origin(&self) -> SelectionOrigin {
        SelectionOrigin::X11Primary
    }

    async fn read(&self) -> RelayResult<Option<String>> {
        let args = vec![
            "-o".to_string(),
            "-selection".to_string(),
            "primary".to_string(),
        ];
        run_capture(&self.program, &args).await
    }
}

/// User-configured source command (config `extra_source_commands`).
///
/// The command is split on whitespace; its stdout is the capture.
pub struct CommandSource {
    display: String,
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSource {
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split_whitespace().map(str::to_string);
        let program = PathBuf::from(parts.next()?);
        Some(Self {
            display: spec.to_string(),
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl SelectionSource for CommandSource {
    fn name(&self) -> &str {
        &self.display
    }

    fn origin(&self) -> SelectionOrigin {
        SelectionOrigin::Command
    }

    async fn read(&self) -> RelayResult<Option<String>> {
        run_capture(&self.program, &self.args).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted sources for exercising the probe, watcher and relay without
    //! a desktop session.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum ScriptStep {
        Text(&'static str),
        Empty,
        Fault,
    }

    /// Replays a fixed script of reads; the final step repeats forever.
    pub struct ScriptedSource {
        origin: SelectionOrigin,
        steps: Mutex<VecDeque<ScriptStep>>,
        hold: Mutex<ScriptStep>,
        reads: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn new(origin: SelectionOrigin, steps: Vec<ScriptStep>) -> Self {
            let hold = steps.last().cloned().unwrap_or(ScriptStep::Empty);
            Self {
                origin,
                steps: Mutex::new(steps.into()),
                hold: Mutex::new(hold),
                reads: AtomicUsize::new(0),
            }
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SelectionSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn origin(&self) -> SelectionOrigin {
            self.origin
        }

        async fn read(&self) -> RelayResult<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let step = match self.steps.lock().unwrap().pop_front() {
                Some(step) => step,
                None => self.hold.lock().unwrap().clone(),
            };
            match step {
                ScriptStep::Text(text) => Ok(Some(text.to_string())),
                ScriptStep::Empty => Ok(None),
                ScriptStep::Fault => Err(RelayError::Source("scripted fault".to_string())),
            }
        }
    }
}
