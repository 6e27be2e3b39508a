//! End-to-end tests against a real listener
//!
//! Each test binds an ephemeral port on 127.0.0.1, serves a private temp
//! directory and talks raw HTTP/1.0 over TCP.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use coi_serve::config::{AppState, Config};
use coi_serve::server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestRoot(PathBuf);

impl TestRoot {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("coi_serve_it_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir.canonicalize().unwrap())
    }

    fn write(&self, rel: &str, contents: &[u8]) {
        let path = self.0.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TestRoot {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    fn start(root: &Path) -> Self {
        let mut config = Config::default();
        config.logging.access_log = false;
        config.performance.connection_timeout = 5;
        let state = Arc::new(AppState::with_root(config, root.to_path_buf()));

        let listener = server::create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::start_server_loop(listener, state, async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn request(&self, method: &str, path: &str) -> RawResponse {
        let request = format!("{method} {path} HTTP/1.0\r\nHost: localhost\r\n\r\n");
        self.send_raw(request.as_bytes()).await
    }

    /// Send arbitrary bytes, well-formed or not, and read until close
    async fn send_raw(&self, request: &[u8]) -> RawResponse {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(request).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        RawResponse::parse(&raw)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawResponse {
    fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has a header block");
        let head = std::str::from_utf8(&raw[..split]).unwrap();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let status = status_line.split_whitespace().nth(1).unwrap().parse().unwrap();
        let headers = lines
            .map(|line| {
                let (name, value) = line.split_once(':').unwrap();
                (name.trim().to_ascii_lowercase(), value.trim().to_string())
            })
            .collect();

        Self {
            status,
            headers,
            body,
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn header_count(&self, name: &str) -> usize {
        self.headers.iter().filter(|(n, _)| n == name).count()
    }

    fn assert_isolated(&self) {
        assert_eq!(self.header_count("cross-origin-embedder-policy"), 1);
        assert_eq!(self.header_count("cross-origin-opener-policy"), 1);
        assert_eq!(self.header("cross-origin-embedder-policy"), Some("require-corp"));
        assert_eq!(self.header("cross-origin-opener-policy"), Some("same-origin"));
    }

    /// Header set without `date`, which ticks every second
    fn stable_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter(|(n, _)| n != "date")
            .cloned()
            .collect()
    }
}

#[tokio::test]
async fn serves_index_html_at_root() {
    let root = TestRoot::new("index");
    root.write("index.html", b"<html></html>");
    let server = TestServer::start(root.path());

    let response = server.request("GET", "/").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"<html></html>");
    assert_eq!(response.header("content-type"), Some("text/html"));
    response.assert_isolated();

    server.stop().await;
}

#[tokio::test]
async fn serves_js_as_application_javascript() {
    let root = TestRoot::new("js");
    root.write("app.js", b"console.log(1);");
    let server = TestServer::start(root.path());

    let response = server.request("GET", "/app.js").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"console.log(1);");
    assert_eq!(response.header("content-type"), Some("application/javascript"));
    response.assert_isolated();

    server.stop().await;
}

#[tokio::test]
async fn missing_file_is_404_and_isolated() {
    let root = TestRoot::new("missing");
    let server = TestServer::start(root.path());

    let response = server.request("GET", "/does-not-exist.txt").await;
    assert_eq!(response.status, 404);
    response.assert_isolated();

    server.stop().await;
}

#[tokio::test]
async fn body_is_exact_file_bytes() {
    let root = TestRoot::new("binary");
    let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    root.write("pkg/module_bg.wasm", &payload);
    let server = TestServer::start(root.path());

    let response = server.request("GET", "/pkg/module_bg.wasm").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/wasm"));
    assert_eq!(response.header("content-length"), Some("70000"));
    assert_eq!(response.body, payload);

    server.stop().await;
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let root = TestRoot::new("repeat");
    root.write("main.js", b"import './worker.js';");
    let server = TestServer::start(root.path());

    let first = server.request("GET", "/main.js").await;
    let second = server.request("GET", "/main.js").await;
    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);
    assert_eq!(first.stable_headers(), second.stable_headers());

    server.stop().await;
}

#[tokio::test]
async fn every_status_carries_isolation_headers() {
    let root = TestRoot::new("statuses");
    root.write("assets/logo.svg", b"<svg/>");
    let server = TestServer::start(root.path());

    let redirect = server.request("GET", "/assets").await;
    assert_eq!(redirect.status, 301);
    assert_eq!(redirect.header("location"), Some("/assets/"));
    redirect.assert_isolated();

    let listing = server.request("GET", "/assets/").await;
    assert_eq!(listing.status, 200);
    assert!(String::from_utf8_lossy(&listing.body).contains("logo.svg"));
    listing.assert_isolated();

    let unsupported = server.request("DELETE", "/assets/logo.svg").await;
    assert_eq!(unsupported.status, 501);
    unsupported.assert_isolated();

    let head = server.request("HEAD", "/assets/logo.svg").await;
    assert_eq!(head.status, 200);
    assert!(head.body.is_empty());
    head.assert_isolated();

    server.stop().await;
}

#[tokio::test]
async fn malformed_request_line_is_400_and_isolated() {
    let root = TestRoot::new("garbage");
    let server = TestServer::start(root.path());

    let response = server.send_raw(b"GARBAGE\r\n\r\n").await;
    assert_eq!(response.status, 400);
    response.assert_isolated();

    server.stop().await;
}

#[tokio::test]
async fn malformed_header_line_is_400_and_isolated() {
    let root = TestRoot::new("bad_header");
    let server = TestServer::start(root.path());

    let response = server
        .send_raw(b"GET / HTTP/1.1\r\nHost: localhost\r\nnot a header\r\n\r\n")
        .await;
    assert_eq!(response.status, 400);
    response.assert_isolated();

    server.stop().await;
}

#[tokio::test]
async fn keep_alive_responses_are_isolated_once_each() {
    let root = TestRoot::new("keep_alive");
    root.write("a.js", b"a");
    root.write("b.js", b"b");
    let server = TestServer::start(root.path());

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(
            b"GET /a.js HTTP/1.1\r\nHost: localhost\r\n\r\n\
              GET /b.js HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let text = String::from_utf8_lossy(&raw).to_ascii_lowercase();
    assert_eq!(text.matches("http/1.1 200 ok").count(), 2);
    assert_eq!(text.matches("cross-origin-embedder-policy: require-corp").count(), 2);
    assert_eq!(text.matches("cross-origin-opener-policy: same-origin").count(), 2);

    server.stop().await;
}

#[tokio::test]
async fn shutdown_closes_the_listener() {
    let root = TestRoot::new("shutdown");
    let server = TestServer::start(root.path());
    let addr = server.addr;

    server.stop().await;
    assert!(TcpStream::connect(addr).await.is_err());
}
