//! Shared utilities for integration tests.
//!
//! Every listener binds an ephemeral port so tests can run in parallel.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use filegate::config::{GatewayConfig, UserConfig};
use filegate::identity::StaticIdentities;
use filegate::lifecycle::Shutdown;
use filegate::{net, GatewayResult, HttpServer};

/// Bound for anything a test waits on.
pub const PATIENCE: Duration = Duration::from_secs(5);

/// Message that makes the mock backend close its WebSocket.
pub const CLOSE_REQUEST: &str = "close-please";

/// Observable state of the mock backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub hits: Arc<AtomicUsize>,
    /// Notified when a WebSocket client closes on the backend.
    pub ws_closed: Arc<Notify>,
}

impl MockBackend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start the mock backend.
///
/// - `/admin/static/*`: two `Content-Type` values and two `X-Multi` values
/// - `/admin/api/command/*`: WebSocket echo; closes on [`CLOSE_REQUEST`]
/// - anything else: echoes method, path, query, headers and body as JSON
pub async fn start_mock_backend() -> (SocketAddr, MockBackend) {
    let state = MockBackend::default();
    let app = Router::new()
        .route("/admin/static/{*file}", get(static_asset))
        .route("/admin/api/command/{*rest}", get(command_socket))
        .fallback(echo)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

async fn echo(State(state): State<MockBackend>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": seen,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn static_asset(State(state): State<MockBackend>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut response = (StatusCode::OK, "body { color: black; }").into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.append(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.append("x-multi", HeaderValue::from_static("one"));
    headers.append("x-multi", HeaderValue::from_static("two"));
    response
}

async fn command_socket(State(state): State<MockBackend>, upgrade: WebSocketUpgrade) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    upgrade.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: MockBackend) {
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) if text.as_str() == CLOSE_REQUEST => {
                let frame = CloseFrame {
                    code: 1000,
                    reason: "bye".into(),
                };
                let _ = socket.send(Message::Close(Some(frame))).await;
                return;
            }
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(msg).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    state.ws_closed.notify_one();
}

/// Start a raw TCP echo server.
pub async fn start_tcp_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
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

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Gateway config pointing at `backend`, with one known user.
pub fn gateway_config(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backend.address = backend.to_string();
    config.timeouts.connect_secs = 2;
    config.auth.users = vec![UserConfig {
        username: "alice".into(),
        password: "secret".into(),
    }];
    config
}

/// A running HTTP gateway. Dropping it does not stop it; call `stop`.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    task: JoinHandle<GatewayResult<()>>,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Trigger shutdown and wait for the server task's result.
    pub async fn finish(self) -> GatewayResult<()> {
        self.stop();
        timeout(PATIENCE, self.task)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

pub async fn spawn_gateway(config: GatewayConfig) -> RunningGateway {
    let listener = net::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let identities = Arc::new(StaticIdentities::new(&config.auth.users));
    let server = HttpServer::new(config, identities).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let task = tokio::spawn(server.run(listener, rx));

    RunningGateway { addr, shutdown, task }
}

/// HTTP client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().timeout(PATIENCE).build().unwrap()
}
