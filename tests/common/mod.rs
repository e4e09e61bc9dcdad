//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use stack_gateway::config::{GatewayConfig, RouteConfig};
use stack_gateway::http::GatewayServer;
use stack_gateway::lifecycle::Shutdown;
use stack_gateway::routing::RouteTable;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read an HTTP head (request line + headers) from the socket.
pub async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => break,
            Ok(_) => buf.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Header value from a raw head, matched case-insensitively.
pub fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Start a backend that answers every request with `status` and `Location`.
///
/// `{backend}` in `location` is replaced with the backend's own address.
///
/// The request path and `X-Forwarded-Prefix` it saw are echoed back as
/// `X-Seen-Path` and `X-Seen-Prefix`.
pub async fn start_redirect_backend(status: u16, location: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let location = location.replace("{backend}", &addr.to_string());

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let location = location.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
                let prefix = header(&head, "x-forwarded-prefix").unwrap_or("").to_string();

                let response = format!(
                    "HTTP/1.1 {} Redirect\r\nLocation: {}\r\nX-Seen-Path: {}\r\nX-Seen-Prefix: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status, location, path, prefix
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that accepts any upgrade, then echoes raw bytes.
///
/// The 101 response carries a root-relative `Location` that must survive.
pub async fn start_upgrade_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let response = "HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nLocation: /settings\r\n\r\n";
                if socket.write_all(response.as_bytes()).await.is_err() {
                    return;
                }

                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

pub fn route(name: &str, prefix: &str, backend: impl Into<String>) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        prefix: prefix.into(),
        backend: backend.into(),
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(routes: Vec<RouteConfig>) -> (SocketAddr, Shutdown) {
    let table = RouteTable::from_config(&routes).unwrap();
    let config = GatewayConfig {
        bind_address: "127.0.0.1:0".into(),
        routes,
        ..GatewayConfig::default()
    };

    let listener = TcpListener::bind(&config.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, table);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

/// HTTP client that never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
