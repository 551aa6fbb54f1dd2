//! Minimal HTTP/1.1 playback-device emulator for integration tests.
//!
//! Implements `GET info`, `POST config` and `POST upload/{index}_{offset}` with an
//! in-memory file table, plus a few knobs to misbehave (fail requests, truncate a
//! chunk and ask for an earlier resume point).

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceOptions {
    /// Answer the first N requests with 503.
    pub fail_first: usize,
    /// Keep only this many bytes of the first upload and answer with a `name:offset` hint.
    pub truncate_first_upload: Option<usize>,
}

#[derive(Debug, Default)]
struct DeviceState {
    files: Vec<String>,
    received: HashMap<String, Vec<u8>>,
    requests: Vec<String>,
    uploads: usize,
}

#[derive(Clone)]
pub struct DeviceServer {
    pub base_url: String,
    state: Arc<Mutex<DeviceState>>,
}

impl DeviceServer {
    /// Bytes received for a logical file name.
    pub fn file(&self, name: &str) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state.received.get(name).cloned().unwrap_or_default()
    }

    /// Request lines seen so far, e.g. `POST /upload/0_0`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

/// Starts the emulator on a background thread. The server runs until the process exits.
pub fn start(opts: DeviceOptions) -> DeviceServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(DeviceState::default()));
    let server = DeviceServer {
        // No scheme and no trailing slash: the worker must normalize it.
        base_url: format!("127.0.0.1:{}", port),
        state: Arc::clone(&state),
    };
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&state);
            thread::spawn(move || handle(stream, &state, opts));
        }
    });
    server
}

fn handle(mut stream: TcpStream, state: &Mutex<DeviceState>, opts: DeviceOptions) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(5)));
    let Some((method, path, body)) = read_request(&mut stream) else {
        return;
    };

    let (status, reply) = {
        let mut st = state.lock().unwrap();
        st.requests.push(format!("{} {}", method, path));
        if st.requests.len() <= opts.fail_first {
            ("503 Service Unavailable", String::new())
        } else {
            route(&mut st, &method, &path, body, opts)
        }
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    let _ = stream.write_all(response.as_bytes());
}

fn route(
    st: &mut DeviceState,
    method: &str,
    path: &str,
    body: Vec<u8>,
    opts: DeviceOptions,
) -> (&'static str, String) {
    match (method, path) {
        ("GET", "/info") => ("200 OK", r#"{"model":"emulator"}"#.to_string()),
        ("POST", "/config") => {
            let config: serde_json::Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(_) => return ("400 Bad Request", String::new()),
            };
            let files: Vec<String> = config["file"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            let mut wanted = serde_json::Map::new();
            for name in &files {
                let have = st.received.get(name).map_or(0, Vec::len) as u64;
                if have < declared_size(name) {
                    wanted.insert(name.clone(), have.into());
                }
            }
            st.files = files;
            ("200 OK", serde_json::Value::Object(wanted).to_string())
        }
        ("POST", p) if p.starts_with("/upload/") => {
            let Some((index, offset)) = p["/upload/".len()..].split_once('_') else {
                return ("404 Not Found", String::new());
            };
            let (Ok(index), Ok(offset)) = (index.parse::<usize>(), offset.parse::<usize>()) else {
                return ("400 Bad Request", String::new());
            };
            let Some(name) = st.files.get(index).cloned() else {
                return ("404 Not Found", String::new());
            };
            st.uploads += 1;
            let mut body = body;
            let mut hint = String::new();
            if st.uploads == 1 {
                if let Some(keep) = opts.truncate_first_upload {
                    body.truncate(keep);
                    hint = format!("{}:{}", name, offset + keep);
                }
            }
            let file = st.received.entry(name).or_default();
            if file.len() != offset {
                return ("409 Conflict", file.len().to_string());
            }
            file.extend_from_slice(&body);
            ("200 OK", hint)
        }
        _ => ("404 Not Found", String::new()),
    }
}

fn declared_size(name: &str) -> u64 {
    name.rsplit_once('-')
        .map(|(_, tail)| {
            tail.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|d| d.parse().ok())
        .unwrap_or(0)
}

/// Reads one request; returns (method, path, body).
fn read_request(stream: &mut TcpStream) -> Option<(String, String, Vec<u8>)> {
    let mut data = Vec::new();
    let mut buf = [0u8; 16 * 1024];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);
    Some((method, path, body))
}
