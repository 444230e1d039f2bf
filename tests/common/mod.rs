//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use stream_relay::{HttpServer, RelayConfig, Shutdown};

/// Request head captured by a mock origin.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RequestHead {
    pub path: String,
    pub headers: HashMap<String, String>,
}

/// Response a mock origin sends back.
#[allow(dead_code)]
pub struct OriginResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

/// Start the relay on an ephemeral port. Returns its address and the
/// shutdown coordinator.
#[allow(dead_code)]
pub async fn start_relay(mut config: RelayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the acceptor a moment to come up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    (addr, shutdown)
}

/// Start a programmable mock origin on an ephemeral port.
///
/// The callback sees the parsed request head, so tests can assert on the
/// spoofed headers the relay sends.
#[allow(dead_code)]
pub async fn start_origin<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RequestHead) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OriginResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = match read_request_head(&mut socket).await {
                            Some(head) => head,
                            None => return,
                        };
                        let response = f(head).await;

                        let status_text = match response.status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let mut head_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                            status_text,
                            response.body.len()
                        );
                        if let Some(ct) = response.content_type {
                            head_str.push_str(&format!("Content-Type: {}\r\n", ct));
                        }
                        head_str.push_str("\r\n");

                        let _ = socket.write_all(head_str.as_bytes()).await;
                        let _ = socket.write_all(&response.body).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock origin that hands the raw socket to the callback once the
/// request head has been consumed. For tests that need partial responses
/// or mid-stream drops.
#[allow(dead_code)]
pub async fn start_raw_origin<F, Fut>(f: F) -> SocketAddr
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            if read_request_head(&mut socket).await.is_some() {
                f(socket).await;
            }
        }
    });

    addr
}

async fn read_request_head(socket: &mut TcpStream) -> Option<RequestHead> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let path = request_line.split_whitespace().nth(1)?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Some(RequestHead { path, headers })
}
