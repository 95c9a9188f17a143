//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use h1wire::config::WireConfig;
use h1wire::lifecycle::Shutdown;
use h1wire::net::Listener;
use h1wire::server::{BearerGuard, DemoHandler, Handler, Server};
use h1wire::wire::framer;
use h1wire::wire::{read_body, Framing, RequestHead, ResponseHead, StreamReader};

pub const TEST_TOKEN: &str = "test-token";

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub head: RequestHead,
    pub body: Bytes,
}

pub type Log = Arc<Mutex<Vec<Recorded>>>;

/// Start a backend that answers every connection with `respond(request, own_addr)`
/// and then closes. Every request it reads is appended to the returned log.
pub async fn start_backend<F>(respond: F) -> (SocketAddr, Log)
where
    F: Fn(&Recorded, SocketAddr) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = Arc::clone(&log);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = Arc::clone(&respond);
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let mut reader = StreamReader::new(socket);
                let Ok(raw) = reader.read_until(b"\r\n\r\n", 64 * 1024).await else {
                    return;
                };
                let head = framer::decode_request_head(&raw).unwrap();
                let framing = Framing::for_request(&head.headers).unwrap();
                let body = read_body(&mut reader, framing, 1 << 20).await.unwrap();
                let request = Recorded { head, body };

                let response = respond(&request, addr);
                recorded.lock().unwrap().push(request);

                let socket = reader.get_mut();
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, log)
}

/// Plain response with a `Content-Length` body.
pub fn response(status: u16, reason: &str, extra: &[(&str, &str)], body: &str) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in extra {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    out.into_bytes()
}

/// Default config for servers under test.
pub fn test_config() -> WireConfig {
    let mut config = WireConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.bearer_token = TEST_TOKEN.into();
    config
}

/// Run the demo server behind the bearer guard on an ephemeral port.
pub async fn start_server(config: WireConfig) -> (SocketAddr, Shutdown) {
    let handler = BearerGuard::new(DemoHandler, &config.auth);
    start_server_with(config, handler).await
}

pub async fn start_server_with<H: Handler>(config: WireConfig, handler: H) -> (SocketAddr, Shutdown) {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections);
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let server = Server::new(Arc::new(config), handler, None);
    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    (addr, shutdown)
}

/// Open a raw connection wrapped in the wire reader.
pub async fn connect(addr: SocketAddr) -> StreamReader<TcpStream> {
    StreamReader::new(TcpStream::connect(addr).await.unwrap())
}

/// Write raw request bytes on an open connection.
pub async fn send(conn: &mut StreamReader<TcpStream>, raw: &[u8]) {
    conn.get_mut().write_all(raw).await.unwrap();
}

/// Read one response (head and Content-Length body) from an open connection.
pub async fn read_response(conn: &mut StreamReader<TcpStream>) -> (ResponseHead, String) {
    let raw = tokio::time::timeout(Duration::from_secs(5), conn.read_until(b"\r\n\r\n", 64 * 1024))
        .await
        .expect("response head in time")
        .unwrap();
    let head = framer::decode_response_head(&raw).unwrap();
    let length = head
        .headers
        .get("content-length")
        .map(|v| v.parse::<u64>().unwrap())
        .unwrap_or(0);
    let body = read_body(conn, Framing::FixedLength(length), 1 << 20)
        .await
        .unwrap();
    (head, String::from_utf8(body.to_vec()).unwrap())
}

/// True once the peer has closed the connection.
pub async fn is_closed(conn: &mut StreamReader<TcpStream>) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_secs(5), conn.has_more()).await,
        Ok(Ok(false)) | Ok(Err(_))
    )
}

/// Send raw bytes on a fresh connection and collect everything until close.
pub async fn raw_exchange(addr: SocketAddr, raw: &[u8]) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(raw).await.unwrap();
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut out))
        .await
        .expect("server closed in time")
        .unwrap();
    String::from_utf8_lossy(&out).into_owned()
}
