//! Integration tests for the `procflow serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port with its
//! own config file, makes HTTP requests, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use tempfile::TempDir;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so separate test binaries don't
/// collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

const CONFIG: &str = r#"
processes:
  - name: requests
    statuses:
      - name: open
        next: [in_progress, rejected]
      - name: in_progress
        next: [open, rejected, done]
      - name: rejected
      - name: done
        schema:
          type: object
          required: [reason]
          properties:
            reason:
              type: string
"#;

/// A running server plus the temp dir holding its config.
struct Server {
    child: Child,
    port: u16,
    _dir: TempDir,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Helper: start `procflow serve` on a fresh port.
fn start_server() -> Server {
    let port = next_port();
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, CONFIG).expect("write config");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_procflow"));
    cmd.env_remove("PROCFLOW_CONFIG");
    cmd.arg("--config").arg(&config);
    cmd.arg("serve").arg("--port").arg(port.to_string());
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start procflow serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server {
        child,
        port,
        _dir: dir,
    }
}

/// Helper: send a raw HTTP request and return (status, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    extra_headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in extra_headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }
    if let Some(body) = body {
        header_lines.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            body.len()
        ));
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Connection: close\r\n\r\n{}",
        method,
        path,
        port,
        header_lines,
        body.unwrap_or("")
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response(&response)
}

fn http_get(port: u16, path: &str) -> (u16, String) {
    http_request(port, "GET", path, &[], None)
}

fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    http_request(port, "POST", path, &[], Some(body))
}

fn http_patch(port: u16, path: &str, body: &str) -> (u16, String) {
    http_request(port, "PATCH", path, &[], Some(body))
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = if headers
        .to_ascii_lowercase()
        .contains("transfer-encoding: chunked")
    {
        decode_chunked(&body)
    } else {
        body
    };

    (status, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = (chunk_start + size).min(remaining.len());
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("invalid JSON ({e}): {body}"))
}

/// Helper: submit a `requests` process and return its uuid.
fn submit(port: u16, body: &str) -> String {
    let (status, body) = http_post(port, "/api/v1/process/", body);
    assert_eq!(status, 200, "{body}");
    json(&body)["uuid"].as_str().expect("uuid").to_string()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn health_returns_ok() {
    let server = start_server();
    let (status, body) = http_get(server.port, "/api/v1/health");
    assert_eq!(status, 200);
    assert_eq!(json(&body), serde_json::json!({"status": "OK"}));
}

#[test]
fn unknown_route_returns_json_404() {
    let server = start_server();
    let (status, body) = http_get(server.port, "/nope");
    assert_eq!(status, 404);
    assert_eq!(json(&body)["status"], "error");
}

#[test]
fn submit_then_get_returns_single_element_array() {
    let server = start_server();
    let uuid = submit(
        server.port,
        r#"{"type": "requests", "payload": {"title": "printer"}}"#,
    );

    let (status, body) = http_get(server.port, &format!("/api/v1/process/requests/{}", uuid));
    assert_eq!(status, 200, "{body}");
    let found = json(&body);
    let found = found.as_array().expect("array");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["uuid"], uuid.as_str());
    assert_eq!(found[0]["type"], "requests");
    assert_eq!(found[0]["payload"]["title"], "printer");
    assert!(found[0]["current_status"].is_null());
    assert_eq!(found[0]["statuses"], serde_json::json!([]));
}

#[test]
fn submit_keeps_caller_uuid_and_rejects_duplicate() {
    let server = start_server();
    let uuid = submit(server.port, r#"{"uuid": "req-1", "type": "requests"}"#);
    assert_eq!(uuid, "req-1");

    let (status, body) = http_post(
        server.port,
        "/api/v1/process/",
        r#"{"uuid": "req-1", "type": "requests"}"#,
    );
    assert_eq!(status, 500, "{body}");
    assert_eq!(json(&body)["status"], "error");
}

#[test]
fn malformed_submit_body_is_400() {
    let server = start_server();
    let (status, body) = http_post(server.port, "/api/v1/process/", "{not json");
    assert_eq!(status, 400);
    assert_eq!(json(&body)["status"], "error");
}

#[test]
fn assign_walks_status_graph() {
    let server = start_server();
    let uuid = submit(server.port, r#"{"type": "requests"}"#);
    let base = format!("/api/v1/process/requests/{}/assign", uuid);

    let (status, body) = http_patch(server.port, &format!("{}/open", base), "{}");
    assert_eq!(status, 204, "{body}");
    let (status, _) = http_patch(
        server.port,
        &format!("{}/in_progress", base),
        r#"{"payload": {"assignee": "ops"}}"#,
    );
    assert_eq!(status, 204);

    let (_, body) = http_get(server.port, &format!("/api/v1/process/requests/{}", uuid));
    let process = &json(&body)[0];
    assert_eq!(process["current_status"], "in_progress");
    assert_eq!(process["statuses"][0]["name"], "in_progress");
    assert_eq!(process["statuses"][0]["payload"]["assignee"], "ops");
    assert_eq!(process["statuses"][1]["name"], "open");
}

#[test]
fn rejected_transitions_are_400() {
    let server = start_server();
    let uuid = submit(server.port, r#"{"type": "requests"}"#);
    let base = format!("/api/v1/process/requests/{}/assign", uuid);
    http_patch(server.port, &format!("{}/open", base), "{}");

    let (status, body) = http_patch(server.port, &format!("{}/done", base), "{}");
    assert_eq!(status, 400);
    assert!(json(&body)["message"].as_str().unwrap().contains("not allowed"));

    let (status, _) = http_patch(server.port, &format!("{}/complete", base), "{}");
    assert_eq!(status, 400);

    http_patch(server.port, &format!("{}/in_progress", base), "{}");
    let (status, body) = http_patch(server.port, &format!("{}/done", base), r#"{"payload": {}}"#);
    assert_eq!(status, 400);
    let message = json(&body)["message"].as_str().unwrap().to_string();
    assert!(message.contains("reason"), "{message}");
    assert!(!message.contains('\n'));

    let (status, _) = http_patch(
        server.port,
        &format!("{}/done", base),
        r#"{"payload": {"reason": "fixed"}}"#,
    );
    assert_eq!(status, 204);
}

#[test]
fn missing_process_is_404() {
    let server = start_server();
    let (status, body) = http_get(server.port, "/api/v1/process/requests/missing");
    assert_eq!(status, 404);
    assert_eq!(json(&body)["status"], "error");

    let (status, _) = http_patch(
        server.port,
        "/api/v1/process/requests/missing/assign/open",
        "{}",
    );
    assert_eq!(status, 404);
}

#[test]
fn list_pages_through_headers() {
    let server = start_server();
    for i in 0..3 {
        submit(server.port, &format!(r#"{{"uuid": "req-{}", "type": "requests"}}"#, i));
    }

    let (status, body) = http_get(server.port, "/api/v1/process/requests/list");
    assert_eq!(status, 200, "{body}");
    let page = json(&body);
    assert_eq!(page["page"], 1);
    assert_eq!(page["page_size"], 10);
    assert_eq!(page["data"].as_array().unwrap().len(), 3);

    let (status, body) = http_request(
        server.port,
        "GET",
        "/api/v1/process/requests/list",
        &[("X-Page", "2"), ("X-Page-Size", "2")],
        None,
    );
    assert_eq!(status, 200, "{body}");
    let page = json(&body);
    assert_eq!(page["page"], 2);
    assert_eq!(page["data"][0]["uuid"], "req-2");

    let (status, _) = http_request(
        server.port,
        "GET",
        "/api/v1/process/requests/list",
        &[("X-Page", "3"), ("X-Page-Size", "2")],
        None,
    );
    assert_eq!(status, 404);

    let (status, _) = http_request(
        server.port,
        "GET",
        "/api/v1/process/requests/list",
        &[("X-Page", "two")],
        None,
    );
    assert_eq!(status, 400);
}
