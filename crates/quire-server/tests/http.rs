//! End-to-end requests against a real socket.

use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use quire_server::{ContentServer, ServerHandle, ServerSettings};
use tempfile::{tempdir, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

async fn start() -> (TempDir, ServerHandle) {
    start_with_timeout(30).await
}

async fn start_with_timeout(request_timeout_secs: u64) -> (TempDir, ServerHandle) {
    let temp = tempdir().unwrap();
    let docs = temp.path().join("docs");
    fs::create_dir_all(docs.join("pages")).unwrap();
    fs::write(docs.join("pages/index.mdx"), "# Index\n").unwrap();
    fs::write(docs.join("a.mdx"), "# A\n").unwrap();
    fs::write(docs.join("b.md"), "# B\n").unwrap();
    fs::write(docs.join("notes.txt"), "hidden").unwrap();

    let config = ServerSettings {
        root: docs,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs,
        ..Default::default()
    }
    .validate()
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let handle = ContentServer::from_listener(config, listener)
        .spawn()
        .unwrap();

    (temp, handle)
}

/// Send a request with the target written verbatim, so no client-side
/// normalization of `..` happens.
async fn request(addr: SocketAddr, method: &str, target: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!(
        "{method} {target} HTTP/1.1\r\nHost: {addr}\r\nOrigin: http://localhost:3000\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();

    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: body.to_string(),
    }
}

#[tokio::test]
async fn fetches_listed_documents() {
    let (_temp, server) = start().await;
    let addr = server.addr();

    let listing = request(addr, "GET", "/api/mdx/files").await;
    assert_eq!(listing.status, 200);
    let files: serde_json::Value = serde_json::from_str(&listing.body).unwrap();
    assert_eq!(
        files,
        serde_json::json!({ "files": ["a.mdx", "b.md", "pages/index.mdx"] })
    );

    let page = request(addr, "GET", "/api/mdx/pages/index.mdx").await;
    assert_eq!(page.status, 200);
    assert_eq!(page.header("content-type"), Some("text/markdown"));
    assert_eq!(page.header("x-file-extension"), Some(".mdx"));
    assert_eq!(page.body, "# Index\n");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn rejects_raw_traversal() {
    let (_temp, server) = start().await;

    let response = request(server.addr(), "GET", "/api/mdx/../../etc/passwd").await;

    assert_eq!(response.status, 400);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["kind"], "InvalidPath");
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("http://localhost:3000")
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn reports_missing_and_disallowed_methods() {
    let (_temp, server) = start().await;
    let addr = server.addr();

    let missing = request(addr, "GET", "/api/mdx/missing.mdx").await;
    assert_eq!(missing.status, 404);
    let body: serde_json::Value = serde_json::from_str(&missing.body).unwrap();
    assert_eq!(body["kind"], "NotFound");
    assert_eq!(body["path"], "missing.mdx");

    let post = request(addr, "POST", "/api/mdx/files").await;
    assert_eq!(post.status, 405);
    assert!(post.header("access-control-allow-origin").is_some());

    let health = request(addr, "GET", "/health").await;
    assert_eq!(health.status, 200);
    assert_eq!(health.body, r#"{"status":"ok"}"#);

    server.stop().await.unwrap();
}

/// Read until the server hangs up, failing if it keeps the socket open.
async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut buf))
        .await
        .expect("server kept a stalled connection open")
        .ok();
    buf
}

#[tokio::test]
async fn drops_clients_that_stall_before_headers_end() {
    let (_temp, server) = start_with_timeout(1).await;
    let addr = server.addr();

    let mut silent = TcpStream::connect(addr).await.unwrap();
    let mut partial = TcpStream::connect(addr).await.unwrap();
    partial
        .write_all(format!("GET /health HTTP/1.1\r\nHost: {addr}\r\n").as_bytes())
        .await
        .unwrap();

    assert!(read_until_closed(&mut silent).await.is_empty());
    let answered = String::from_utf8_lossy(&read_until_closed(&mut partial).await).into_owned();
    assert!(!answered.contains("200"), "{answered}");

    let health = request(addr, "GET", "/health").await;
    assert_eq!(health.status, 200);

    server.stop().await.unwrap();
}
