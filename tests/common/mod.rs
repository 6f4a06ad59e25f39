//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use fnproxy::config::HealthCheckConfig;
use fnproxy::grouper::AllGrouper;
use fnproxy::router::ChRouter;
use fnproxy::store::MemoryStore;
use fnproxy::{ProxyServer, Shutdown};

/// Scriptable stand-in for one function-execution server.
///
/// Serves `/version` for health probes and echoes its name on every other
/// path so tests can tell which node handled a proxied request.
pub struct FunctionNode {
    pub name: &'static str,
    /// When false, `/version` answers 500.
    pub healthy: AtomicBool,
    /// Version string reported by `/version`.
    pub version: Mutex<String>,
    /// When nonzero, proxied responses carry `x-fnproxy-wait: <n>ms`.
    pub wait_hint_ms: AtomicU64,
    /// Proxied (non-probe) requests served.
    pub hits: AtomicU32,
}

impl FunctionNode {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            healthy: AtomicBool::new(true),
            version: Mutex::new("0.0.104".to_string()),
            wait_hint_ms: AtomicU64::new(0),
            hits: AtomicU32::new(0),
        })
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = version.to_string();
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a mock function server for `node` on `addr`.
pub async fn start_function_node(addr: SocketAddr, node: Arc<FunctionNode>) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let node = node.clone();
                    tokio::spawn(async move {
                        handle(socket, node).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

async fn handle(mut socket: TcpStream, node: Arc<FunctionNode>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    // Read the request head.
    let head_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) => return,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if buffer.len() > 16 * 1024 {
                    return;
                }
            }
            Err(_) => return,
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    // Consume the rest of the body before responding.
    let mut remaining = content_length.saturating_sub(buffer.len() - head_end);
    while remaining > 0 {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => remaining = remaining.saturating_sub(n),
        }
    }

    let response = if path == "/version" {
        if node.healthy.load(Ordering::SeqCst) {
            let body = format!("{{\"version\":\"{}\"}}", node.version.lock().unwrap());
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
        } else {
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndead"
                .to_string()
        }
    } else {
        node.hits.fetch_add(1, Ordering::SeqCst);
        let hint = node.wait_hint_ms.load(Ordering::SeqCst);
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n",
            node.name.len()
        );
        if hint > 0 {
            response.push_str(&format!("x-fnproxy-wait: {}ms\r\n", hint));
        }
        response.push_str("\r\n");
        response.push_str(node.name);
        response
    };

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Health-check settings tuned so tests converge within a couple of seconds.
pub fn fast_health() -> HealthCheckConfig {
    HealthCheckConfig {
        interval_secs: 1,
        timeout_secs: 2,
        ..HealthCheckConfig::default()
    }
}

/// Boot a proxy with the static driver on `addr`, seeded with `seeds`.
///
/// Membership lives in a fresh in-memory store. Returns the shutdown
/// handle; call `trigger` to stop the probe loop and the server.
pub async fn start_proxy(addr: SocketAddr, seeds: &[&str], health: HealthCheckConfig) -> Shutdown {
    let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
    let client: Client<HttpConnector, Body> =
        Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let grouper = AllGrouper::new(&health, &seeds, Arc::new(MemoryStore::new()), client)
        .await
        .unwrap();

    let shutdown = Shutdown::new();
    tokio::spawn(grouper.clone().run(shutdown.subscribe()));

    let listener = TcpListener::bind(addr).await.unwrap();
    let server = ProxyServer::new(grouper, Arc::new(ChRouter::new()));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    shutdown
}
