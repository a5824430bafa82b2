//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::expect_used)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;

/// Uncased vocabulary covering the Paris example.
pub const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\nparis\nis\nthe\ncapital\nof\nfrance\n.\nwhat\n?\ncap\n##ital\n";

/// Id of `paris` in [`VOCAB`].
pub const PARIS_ID: i64 = 4;

/// Writes [`VOCAB`] to a temporary file.
pub fn vocab_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("vocab.txt");
    std::fs::write(&path, VOCAB).expect("write vocab");
    (temp_dir, path)
}

/// A canned HTTP response.
pub struct StubResponse {
    pub status: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Advertised length when it differs from the body actually sent.
    pub content_length: Option<usize>,
}

impl StubResponse {
    /// Binary-extension inference response with FP32 outputs.
    pub fn logits(start: &[f32], end: &[f32]) -> Self {
        let header = serde_json::json!({
            "model_name": "bert",
            "model_version": "1",
            "outputs": [
                {"name": "start_logits", "shape": [1, start.len()], "datatype": "FP32",
                 "parameters": {"binary_data_size": start.len() * 4}},
                {"name": "end_logits", "shape": [1, end.len()], "datatype": "FP32",
                 "parameters": {"binary_data_size": end.len() * 4}},
            ]
        });
        let mut body = serde_json::to_vec(&header).expect("header json");
        let header_length = body.len();
        for value in start.iter().chain(end) {
            body.extend_from_slice(&value.to_le_bytes());
        }
        Self {
            status: "200 OK",
            headers: vec![
                (
                    "Content-Type".to_string(),
                    "application/octet-stream".to_string(),
                ),
                (
                    "Inference-Header-Content-Length".to_string(),
                    header_length.to_string(),
                ),
            ],
            body,
            content_length: None,
        }
    }

    /// JSON response with the given status line.
    pub fn json(status: &'static str, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value).expect("json body"),
            content_length: None,
        }
    }

    /// Empty response with the given status line.
    pub fn empty(status: &'static str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            content_length: None,
        }
    }

    /// Response whose connection closes before the advertised body arrives.
    pub fn truncated(status: &'static str, sent: &[u8], advertised: usize) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: sent.to_vec(),
            content_length: Some(advertised),
        }
    }
}

/// Serves `responses` to successive connections on a local port.
///
/// The handle yields the raw requests received, in order.
pub fn serve(responses: Vec<StubResponse>) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            requests.push(read_request(&mut stream));

            let mut head = format!("HTTP/1.1 {}\r\n", response.status);
            for (name, value) in &response.headers {
                head.push_str(&format!("{name}: {value}\r\n"));
            }
            head.push_str(&format!(
                "Content-Length: {}\r\nConnection: close\r\n\r\n",
                response.content_length.unwrap_or(response.body.len())
            ));
            stream.write_all(head.as_bytes()).expect("write head");
            stream.write_all(&response.body).expect("write body");
            stream.flush().expect("flush");
        }
        requests
    });

    (port, handle)
}

/// Accepts one connection and never answers it.
pub fn serve_silent(hold: Duration) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(hold);
            drop(stream);
        }
    });
    port
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn read_request(stream: &mut std::net::TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buf).expect("read");
        if n == 0 {
            return data;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf).expect("read body");
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    data
}

/// Scores peaking at `position`, with `[CLS]` at 1.0 each.
pub fn peak_scores(len: usize, position: usize) -> (Vec<f32>, Vec<f32>) {
    let mut start = vec![0.0; len];
    let mut end = vec![0.0; len];
    start[0] = 1.0;
    end[0] = 1.0;
    start[position] = 8.0;
    end[position] = 8.0;
    (start, end)
}
