//! Minimal HTTP/1.1 stub server for driving the real reqwest code paths.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
struct Route {
    path: String,
    status: u16,
    body: String,
    delay: Duration,
}

/// A received request: the request line plus headers, and the body
#[derive(Debug, Clone)]
pub struct Recorded {
    pub head: String,
    pub body: String,
}

pub struct Stub {
    pub base: String,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    /// Answer requests for `path` with `status` and a JSON body
    pub fn mock(&self, path: &str, status: u16, body: serde_json::Value) {
        self.mock_delayed(path, Duration::ZERO, status, body);
    }

    /// Like `mock`, but hold the connection open for `delay` before answering
    pub fn mock_delayed(&self, path: &str, delay: Duration, status: u16, body: serde_json::Value) {
        self.routes.lock().unwrap().push(Route {
            path: path.to_string(),
            status,
            body: body.to_string(),
            delay,
        });
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose request line contains `needle`
    pub fn requests_to(&self, needle: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.head.lines().next().unwrap_or_default().contains(needle))
            .collect()
    }
}

/// Serve canned JSON responses keyed by request path (query string ignored).
/// Unknown paths get a 404.
pub async fn serve() -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(Mutex::new(Vec::new()));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let table = Arc::clone(&routes);
    let log = Arc::clone(&requests);

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let table = Arc::clone(&table);
            let log = Arc::clone(&log);
            tokio::spawn(async move { handle(socket, &table, &log).await });
        }
    });

    Stub {
        base: format!("http://{addr}"),
        routes,
        requests,
    }
}

async fn handle(mut socket: TcpStream, routes: &Mutex<Vec<Route>>, log: &Mutex<Vec<Recorded>>) {
    let Some(recorded) = read_request(&mut socket).await else {
        return;
    };

    let target = recorded.head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();
    log.lock().unwrap().push(recorded);

    let (status, body, delay) = routes
        .lock()
        .unwrap()
        .iter()
        .find(|r| r.path == path)
        .map(|r| (r.status, r.body.clone(), r.delay))
        .unwrap_or((404, "{}".to_string(), Duration::ZERO));

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();
    Some(Recorded { head, body })
}
