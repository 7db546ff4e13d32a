use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use std::{fs, thread};
use tempfile::TempDir;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub child: Child,
    pub socket_path: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bin_path = env!("CARGO_BIN_EXE_selrelay");

        // Isolate the daemon: its socket, handoff and config all resolve
        // under the temp dir, and with no display env it runs with zero
        // selection sources and zero event feeds.
        let runtime_dir = temp_dir.path().join("runtime");
        let config_dir = temp_dir.path().join("config");

        fs::create_dir_all(&runtime_dir).expect("Failed to create runtime dir");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        let child = Command::new(bin_path)
            .env("XDG_RUNTIME_DIR", &runtime_dir)
            .env("XDG_CONFIG_HOME", &config_dir)
            .env_remove("WAYLAND_DISPLAY")
            .env_remove("DISPLAY")
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("Failed to spawn selrelay daemon");

        let socket_path = runtime_dir.join("selrelay.sock");

        let ctx = TestContext {
            temp_dir,
            child,
            socket_path,
        };

        ctx.wait_for_socket();
        ctx
    }

    fn wait_for_socket(&self) {
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if self.socket_path.exists() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        panic!("Timed out waiting for socket at {:?}", self.socket_path);
    }

    /// Open a fresh connection, send one line, return the first response line.
    pub fn round_trip(&self, request: &str) -> String {
        let mut stream =
            UnixStream::connect(&self.socket_path).expect("Failed to connect to IPC socket");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("Failed to set read timeout");

        stream
            .write_all(request.as_bytes())
            .expect("Failed to write to socket");
        stream.write_all(b"\n").expect("Failed to write newline");

        let mut response = String::new();
        let mut reader = BufReader::new(stream);
        reader
            .read_line(&mut response)
            .expect("Failed to read response");
        response
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
