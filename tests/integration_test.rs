use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream;
use std::time::Duration;

mod common;
use common::TestContext;

#[test]
fn test_socket_permissions() {
    let ctx = TestContext::new();

    let metadata = fs::metadata(&ctx.socket_path).expect("Failed to get socket metadata");
    let permissions = metadata.permissions();
    let mode = permissions.mode();

    // Check for 0o600 (rw-------)
    assert_eq!(
        mode & 0o777,
        0o600,
        "Socket must be readable and writable by the owner only"
    );
}

#[test]
fn test_ping_round_trip() {
    let ctx = TestContext::new();

    let response = ctx.round_trip(r#"{"type":"ping","seq_id":1}"#);
    assert!(
        response.contains("\"alive\""),
        "Ping should answer alive: {}",
        response
    );
    assert!(response.contains("\"seq_id\":1"));
}

#[test]
fn test_get_selection_reports_explicit_empty_state() {
    let ctx = TestContext::new();

    // The daemon runs with no selection sources; its last-known snapshot
    // must be the explicit empty one, never missing
    let response = ctx.round_trip(r#"{"type":"get_selection","seq_id":2}"#);
    assert!(
        response.contains("\"selection\""),
        "Expected a selection response: {}",
        response
    );
    assert!(response.contains("\"text\":\"\""));
    assert!(response.contains("\"origin\":\"none\""));
}

#[test]
fn test_capture_now_round_trip() {
    let ctx = TestContext::new();

    let response = ctx.round_trip(r#"{"type":"capture_now","seq_id":3}"#);
    assert!(
        response.contains("\"selection\""),
        "CaptureNow should answer with a selection: {}",
        response
    );
}

#[test]
fn test_unknown_message_kind_is_ignored() {
    let ctx = TestContext::new();

    let mut stream =
        UnixStream::connect(&ctx.socket_path).expect("Failed to connect to IPC socket");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("Failed to set read timeout");

    // An unknown kind produces no response and must not kill the connection
    stream
        .write_all(b"{\"type\":\"reticulate_splines\",\"seq_id\":7}\n")
        .expect("Failed to write unknown message");
    stream
        .write_all(b"{\"type\":\"ping\",\"seq_id\":8}\n")
        .expect("Failed to write ping");

    let mut response = String::new();
    let mut reader = BufReader::new(stream);
    reader
        .read_line(&mut response)
        .expect("Failed to read response");

    assert!(
        response.contains("\"alive\""),
        "Connection should survive an unknown message: {}",
        response
    );
    assert!(response.contains("\"seq_id\":8"));
}

#[test]
fn test_subscribe_is_acknowledged() {
    let ctx = TestContext::new();

    let response = ctx.round_trip(r#"{"type":"subscribe","seq_id":4}"#);
    assert!(
        response.contains("\"ack\""),
        "Subscribe should be acknowledged: {}",
        response
    );
    assert!(response.contains("\"success\":true"));
}

#[test]
fn test_oversized_request_drops_connection_but_not_daemon() {
    let ctx = TestContext::new();

    let mut stream =
        UnixStream::connect(&ctx.socket_path).expect("Failed to connect to IPC socket");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("Failed to set read timeout");

    // Way past the per-line cap
    let huge = "x".repeat(256 * 1024);
    stream
        .write_all(huge.as_bytes())
        .expect("Failed to write oversized request");
    stream.write_all(b"\n").expect("Failed to write newline");

    let mut response = String::new();
    let mut reader = BufReader::new(stream);
    let n = reader
        .read_line(&mut response)
        .expect("Failed to read after oversized request");
    assert_eq!(n, 0, "Oversized request should close the connection");

    // The daemon itself keeps serving
    let response = ctx.round_trip(r#"{"type":"ping","seq_id":9}"#);
    assert!(response.contains("\"alive\""));
}
