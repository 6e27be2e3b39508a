//! Process-level behavior of the `coi_serve` binary

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

fn spawn_on_port(port: u16) -> Child {
    Command::new(env!("CARGO_BIN_EXE_coi_serve"))
        .env("COI_SERVER__HOST", "127.0.0.1")
        .env("COI_SERVER__PORT", port.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary starts")
}

fn wait_with_deadline(child: &mut Child, deadline: Duration) -> Option<ExitStatus> {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}

#[test]
fn occupied_port_exits_non_zero() {
    let holder = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = holder.local_addr().unwrap().port();

    let mut child = spawn_on_port(port);
    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    if status.is_none() {
        let _ = child.kill();
    }

    let status = status.expect("server should exit when the port is taken");
    assert!(!status.success());

    let mut stderr = String::new();
    child.stderr.take().unwrap().read_to_string(&mut stderr).unwrap();
    assert!(stderr.contains("Failed to bind"), "stderr was: {stderr}");
}

#[cfg(unix)]
#[test]
fn interrupt_prints_notice_and_exits_zero() {
    let port = {
        let free = TcpListener::bind("127.0.0.1:0").unwrap();
        free.local_addr().unwrap().port()
    };

    let mut child = spawn_on_port(port);
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let mut banner = String::new();
    stdout.read_line(&mut banner).unwrap();
    assert_eq!(banner.trim(), format!("Serving HTTP on http://localhost:{port}"));

    // A served request proves the accept loop, and with it the signal
    // listener, is running
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .write_all(b"GET /does-not-exist.txt HTTP/1.0\r\n\r\n")
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.0 404") || response.starts_with("HTTP/1.1 404"));
    assert!(response.contains("cross-origin-embedder-policy: require-corp"));

    let killed = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    if status.is_none() {
        let _ = child.kill();
    }
    assert_eq!(status.and_then(|s| s.code()), Some(0));

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();
    assert!(rest.contains("Server stopped."), "stdout was: {rest}");
}

#[cfg(unix)]
#[test]
fn interrupt_right_after_banner_exits_zero() {
    let port = {
        let free = TcpListener::bind("127.0.0.1:0").unwrap();
        free.local_addr().unwrap().port()
    };

    let mut child = spawn_on_port(port);
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    // no request first: the banner alone must mean Ctrl+C is handled
    let mut banner = String::new();
    stdout.read_line(&mut banner).unwrap();
    assert!(banner.starts_with("Serving HTTP on"), "banner was: {banner}");

    let killed = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    if status.is_none() {
        let _ = child.kill();
    }
    assert_eq!(status.and_then(|s| s.code()), Some(0));

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();
    assert!(rest.contains("Server stopped."), "stdout was: {rest}");
}
