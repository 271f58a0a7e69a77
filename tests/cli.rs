use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const MESSAGE: &str =
    "To: a@b\nEnvelope-to: x@y\nReturn-path: <sender@z>\nReceived: from foo\n\nBODY";

/// Run the binary with a `/bin/sh` collector as the MTA that stores what it
/// reads in `out` and exits with `script_tail`'s status.
fn run_bounce(input: &[u8], out: &Path, script_tail: &str) -> Output {
    let script = format!("cat > \"$1\"; {}", script_tail);
    let mut child = Command::new(env!("CARGO_BIN_EXE_exim-bounce"))
        .arg("--mta-path=/bin/sh")
        .arg("--mta-arg=-c")
        .arg(format!("--mta-arg={}", script))
        .arg("--mta-arg=collector")
        .arg(format!("--mta-arg={}", out.display()))
        .arg("--trust-group=")
        .arg("--msgid-domain=mx.example.com")
        .env_remove("RUST_LOG")
        .env_remove("LOG_LEVEL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    // The binary may stop reading early; a broken pipe here is expected then.
    let _ = stdin.write_all(input);
    drop(stdin);
    child.wait_with_output().unwrap()
}

#[test]
fn bounce_is_delivered_with_collector_status() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(MESSAGE.as_bytes(), &out, "exit 3");

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let mail = fs::read_to_string(&out).unwrap();
    assert!(mail.starts_with("Return-path: <>"));
    assert!(mail.contains("X-Failed-Recipients: x@y"));
    assert!(mail.contains("To: <sender@z>"));
    assert!(mail.contains("@mx.example.com>\n"));
    assert!(mail.ends_with("BODY"));
}

#[test]
fn successful_collector_gives_success() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(MESSAGE.as_bytes(), &out, "exit 0");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());
}

#[test]
fn missing_envelope_to_exits_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(b"Return-path: <s@z>\nReceived: from a\n\nBODY", &out, "exit 0");
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());
    assert!(!out.exists());
}

#[test]
fn bounce_of_bounce_exits_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let input = b"Envelope-to: x@y\nReturn-path: <>\nReceived: from a\n\nBODY";
    let output = run_bounce(input, &out, "exit 0");
    assert_eq!(output.status.code(), Some(0));
    assert!(!out.exists());
}

#[test]
fn missing_received_fails_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(b"Envelope-to: x@y\nReturn-path: <s@z>\n\nBODY", &out, "exit 0");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sanity check failed, no Received headers"));
    assert!(!out.exists());
}

#[test]
fn oversized_header_line_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let input = format!("Envelope-to: x@y\nX-Junk: {}\n\nBODY", "j".repeat(9000));
    let output = run_bounce(input.as_bytes(), &out, "exit 0");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("header line too long (8192)"));
    assert!(!out.exists());
}

#[test]
fn empty_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(b"", &out, "exit 0");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty message without headers"));
}

#[test]
fn collector_killed_by_signal_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(MESSAGE.as_bytes(), &out, "kill -TERM $$");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("signal 15"));
}

#[test]
fn collector_that_stops_reading_fails_the_run() {
    let mut input = MESSAGE.as_bytes().to_vec();
    input.extend(std::iter::repeat(b'x').take(4 * 1024 * 1024));

    let mut child = Command::new(env!("CARGO_BIN_EXE_exim-bounce"))
        .arg("--mta-path=/bin/sh")
        .arg("--mta-arg=-c")
        .arg("--mta-arg=exec 0<&-; sleep 30")
        .arg("--trust-group=")
        .env_remove("RUST_LOG")
        .env_remove("LOG_LEVEL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let _ = stdin.write_all(&input);
    drop(stdin);
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error piping message to MTA process"));
    assert!(stderr.contains("killed pid"));
}

#[test]
fn missing_mta_binary_fails() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_exim-bounce"))
        .arg("--mta-path=/nonexistent/exim4")
        .arg("--trust-group=")
        .env_remove("RUST_LOG")
        .env_remove("LOG_LEVEL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let _ = stdin.write_all(MESSAGE.as_bytes());
    drop(stdin);
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/exim4"));
}

#[test]
fn fatal_diagnostic_survives_disabled_logging() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_exim-bounce"))
        .arg("--mta-path=/bin/false")
        .arg("--trust-group=")
        .env("RUST_LOG", "off")
        .env_remove("LOG_LEVEL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let _ = stdin.write_all(b"Envelope-to: x@y\nReturn-path: <s@z>\n\nBODY");
    drop(stdin);
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr, "exim-bounce: sanity check failed, no Received headers\n");
}

#[test]
fn fatal_diagnostic_is_tagged_in_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mail");
    let output = run_bounce(b"Envelope-to: x@y\nReturn-path: <s@z>\nReceived: a", &out, "exit 0");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[main] header line too long (8192)"));
    assert!(!out.exists());
}
