use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

mod common;
use common::TestContext;

#[test]
fn test_ipc_garbage_flood() {
    let ctx = TestContext::new();

    // Garbage of every shape on one connection; none of it is an error
    let garbage = [
        "asdfghjkl",
        "!!! @@@ ###",
        "1234567890",
        "{\"type\":\"ping\"}",                  // missing seq_id
        "{\"seq_id\":1}",                       // missing type
        "{\"type\":\"selection\",\"seq_id\":1}", // a response, not a request
        "{}",
        "",
        " ",
    ];

    let mut stream =
        UnixStream::connect(&ctx.socket_path).expect("Failed to connect to IPC socket");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("Failed to set read timeout");

    for line in garbage {
        stream
            .write_all(line.as_bytes())
            .expect("Failed to write garbage");
        stream.write_all(b"\n").expect("Failed to write newline");
    }

    // The same connection still answers a valid request
    stream
        .write_all(b"{\"type\":\"ping\",\"seq_id\":42}\n")
        .expect("Failed to write ping");

    let mut response = String::new();
    let mut reader = BufReader::new(stream);
    reader
        .read_line(&mut response)
        .expect("Failed to read response");
    assert!(
        response.contains("\"alive\""),
        "Server died on garbage flood: {}",
        response
    );
}

#[test]
fn test_ipc_rapid_reconnects() {
    let ctx = TestContext::new();

    // A burst of short-lived connections must not wedge the accept loop
    for i in 0..50 {
        let request = format!("{{\"type\":\"ping\",\"seq_id\":{}}}", i);
        let response = ctx.round_trip(&request);
        assert!(
            response.contains("\"alive\""),
            "Ping {} failed: {}",
            i,
            response
        );
    }
}

#[test]
fn test_ipc_binary_noise_then_recovery() {
    let ctx = TestContext::new();

    // Raw bytes, no newline, abrupt close
    {
        let mut stream =
            UnixStream::connect(&ctx.socket_path).expect("Failed to connect to IPC socket");
        let noise: Vec<u8> = (0u8..=255).collect();
        let _ = stream.write_all(&noise);
        // Dropped without a newline
    }

    let response = ctx.round_trip(r#"{"type":"ping","seq_id":100}"#);
    assert!(
        response.contains("\"alive\""),
        "Server did not recover from binary noise: {}",
        response
    );
}
