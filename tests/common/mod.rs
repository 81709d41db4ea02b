#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

/// One request as seen by the mock backend.
#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub method: String,
    pub target: String,
    pub body: String,
}

/// Canned response for a method + target prefix. Routes are matched in
/// declaration order, so put the more specific target first.
pub struct Route {
    pub method: &'static str,
    pub target_prefix: &'static str,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Route {
    pub fn json(method: &'static str, target_prefix: &'static str, body: &str) -> Self {
        Self {
            method,
            target_prefix,
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }
}

/// Minimal HTTP/1.1 server backed by a raw [`TcpListener`], recording every
/// request it receives.
pub struct MockApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockApi {
    pub fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(vec![]));
        let log = Arc::clone(&requests);
        let routes = Arc::new(routes);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let log = Arc::clone(&log);
                let routes = Arc::clone(&routes);

                thread::spawn(move || handle(stream, &routes, &log));
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Polls for a matching request, allowing for detached work that finishes
    /// after the client already got its response.
    pub fn wait_for_request(&self, method: &str, target_prefix: &str) -> Option<ReceivedRequest> {
        for _ in 0..50 {
            let found = self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|request| {
                    request.method == method && request.target.starts_with(target_prefix)
                })
                .cloned();

            if found.is_some() {
                return found;
            }

            thread::sleep(Duration::from_millis(100));
        }

        None
    }
}

fn handle(mut stream: TcpStream, routes: &[Route], log: &Mutex<Vec<ReceivedRequest>>) {
    let Some((head, mut rest)) = read_head(&mut stream) else {
        return;
    };

    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while rest.len() < content_length {
        let mut chunk = [0u8; 1024];
        let Ok(n) = stream.read(&mut chunk) else { break };
        if n == 0 {
            break;
        }
        rest.extend_from_slice(&chunk[..n]);
    }

    log.lock().unwrap().push(ReceivedRequest {
        method: method.clone(),
        target: target.clone(),
        body: String::from_utf8_lossy(&rest).to_string(),
    });

    let route = routes
        .iter()
        .find(|route| route.method == method && target.starts_with(route.target_prefix));

    let (status, content_type, body) = match route {
        Some(route) => (route.status, route.content_type, route.body.clone()),
        None => (404, "text/plain", b"mock: no route".to_vec()),
    };

    let headers = format!(
        "HTTP/1.1 {status} Mock\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len(),
    );

    let _ = stream.write_all(headers.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

/// Reads until the end of the header block, returning the head as text and
/// any body bytes already consumed.
fn read_head(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);

        if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buffer[..end]).to_string();
            let rest = buffer[end + 4..].to_vec();
            return Some((head, rest));
        }
    }
}
