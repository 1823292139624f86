//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete upgrade handshake with client
//! - Establish WebSocket connection to backend
//! - Bidirectional message forwarding
//! - Close both endpoints once either side is done
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Bridge States
//! ```text
//! Idle → AwaitingClientUpgrade → ClientUpgraded → AwaitingBackendDial
//!      → BackendConnected → Bridging → Closed
//! any non-terminal state → Failed
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{
    self,
    client::IntoClientRequest,
    handshake::client::Request as BackendRequest,
    protocol::{frame::coding::CloseCode, CloseFrame as BackendCloseFrame},
    Message as BackendMessage,
};

use crate::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// Upper bound for sending a close frame to a peer that may already be gone.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of one bridged connection pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    AwaitingClientUpgrade,
    ClientUpgraded,
    AwaitingBackendDial,
    BackendConnected,
    Bridging,
    Closed,
    Failed,
}

impl BridgeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BridgeState::Closed | BridgeState::Failed)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which endpoint ended the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Backend,
}

/// One caller ↔ backend WebSocket bridge.
#[derive(Debug)]
pub struct Bridge {
    peer: SocketAddr,
    state: BridgeState,
}

impl Bridge {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            state: BridgeState::Idle,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn transition(&mut self, next: BridgeState) {
        if self.state.is_terminal() {
            return;
        }
        tracing::trace!(peer = %self.peer, from = %self.state, to = %next, "Bridge state change");
        self.state = next;
    }

    /// Fail the bridge and hand back the error.
    pub fn fail(&mut self, error: GatewayError) -> GatewayError {
        tracing::warn!(peer = %self.peer, state = %self.state, error = %error, "Bridge failed");
        self.transition(BridgeState::Failed);
        error
    }

    /// Drive an upgraded client socket: dial the backend, then relay until
    /// either side closes.
    pub async fn run(
        mut self,
        client: WebSocket,
        backend_request: BackendRequest,
        dial_timeout: Duration,
    ) -> GatewayResult<Side> {
        self.transition(BridgeState::ClientUpgraded);
        self.transition(BridgeState::AwaitingBackendDial);

        let target = backend_request.uri().to_string();
        let dialed = tokio::time::timeout(dial_timeout, tokio_tungstenite::connect_async(backend_request)).await;
        let backend = match dialed {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                reject_client(client).await;
                return Err(self.fail(GatewayError::dial(target, e)));
            }
            Err(_) => {
                reject_client(client).await;
                return Err(self.fail(GatewayError::dial(target, "timed out")));
            }
        };
        self.transition(BridgeState::BackendConnected);
        tracing::debug!(peer = %self.peer, backend = %target, "Backend WebSocket connected");

        self.transition(BridgeState::Bridging);
        metrics::bridge_opened();
        let outcome = bridge(client, backend).await;
        metrics::bridge_closed();

        match outcome {
            Ok(side) => {
                self.transition(BridgeState::Closed);
                tracing::debug!(peer = %self.peer, closed_by = ?side, "Bridge closed");
                Ok(side)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

/// Tell an already-upgraded caller that the backend is unreachable.
async fn reject_client(mut client: WebSocket) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: "backend unavailable".into(),
    };
    let _ = tokio::time::timeout(CLOSE_GRACE, async {
        let _ = client.send(Message::Close(Some(frame))).await;
        let _ = client.close().await;
    })
    .await;
}

/// Relay messages both ways until one direction ends, then close both
/// endpoints. Returns the side that ended first.
pub async fn bridge<C, B>(client: C, backend: B) -> GatewayResult<Side>
where
    C: Stream<Item = Result<Message, axum::Error>> + Sink<Message, Error = axum::Error> + Unpin,
    B: Stream<Item = Result<BackendMessage, tungstenite::Error>> + Sink<BackendMessage, Error = tungstenite::Error> + Unpin,
{
    let (mut client_tx, mut client_rx) = client.split();
    let (mut backend_tx, mut backend_rx) = backend.split();

    let upstream = async {
        while let Some(msg) = client_rx.next().await {
            let msg = msg.map_err(relay_error)?;
            let closing = matches!(msg, Message::Close(_));
            backend_tx.send(to_backend(msg)).await.map_err(relay_error)?;
            if closing {
                break;
            }
        }
        Ok::<(), GatewayError>(())
    };

    let downstream = async {
        while let Some(msg) = backend_rx.next().await {
            let msg = msg.map_err(relay_error)?;
            let Some(msg) = to_client(msg) else {
                continue;
            };
            let closing = matches!(msg, Message::Close(_));
            client_tx.send(msg).await.map_err(relay_error)?;
            if closing {
                break;
            }
        }
        Ok::<(), GatewayError>(())
    };

    let (side, result) = tokio::select! {
        result = upstream => (Side::Client, result),
        result = downstream => (Side::Backend, result),
    };

    // Whichever direction finished, neither endpoint gets another reader.
    let _ = tokio::time::timeout(CLOSE_GRACE, client_tx.close()).await;
    let _ = tokio::time::timeout(CLOSE_GRACE, backend_tx.close()).await;

    result.map(|_| side)
}

fn relay_error(e: impl fmt::Display) -> GatewayError {
    GatewayError::RelayIo(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

/// Caller message → backend message.
pub fn to_backend(msg: Message) -> BackendMessage {
    match msg {
        Message::Text(text) => BackendMessage::Text(text.as_str().into()),
        Message::Binary(data) => BackendMessage::Binary(data),
        Message::Ping(data) => BackendMessage::Ping(data),
        Message::Pong(data) => BackendMessage::Pong(data),
        Message::Close(frame) => BackendMessage::Close(frame.map(|f| BackendCloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.as_str().into(),
        })),
    }
}

/// Backend message → caller message. Raw frames are not relayed.
pub fn to_client(msg: BackendMessage) -> Option<Message> {
    let msg = match msg {
        BackendMessage::Text(text) => Message::Text(text.as_str().into()),
        BackendMessage::Binary(data) => Message::Binary(data),
        BackendMessage::Ping(data) => Message::Ping(data),
        BackendMessage::Pong(data) => Message::Pong(data),
        BackendMessage::Close(frame) => Message::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().into(),
        })),
        BackendMessage::Frame(_) => return None,
    };
    Some(msg)
}

/// Build the backend handshake request for `target` carrying `headers`.
pub fn backend_request(target: &axum::http::Uri, headers: axum::http::HeaderMap) -> GatewayResult<BackendRequest> {
    let mut request = target
        .clone()
        .into_client_request()
        .map_err(|e| GatewayError::UpgradeHandshake(format!("invalid backend request: {}", e)))?;
    for (name, value) in headers.iter() {
        request.headers_mut().append(name.clone(), value.clone());
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn message_kinds_survive_both_directions() {
        let text = to_backend(Message::Text("ls -la".into()));
        assert_eq!(text, BackendMessage::Text("ls -la".into()));

        let binary = to_client(BackendMessage::Binary(Bytes::from_static(b"\x00\x01"))).unwrap();
        assert_eq!(binary, Message::Binary(Bytes::from_static(b"\x00\x01")));

        let ping = to_backend(Message::Ping(Bytes::from_static(b"p")));
        assert_eq!(ping, BackendMessage::Ping(Bytes::from_static(b"p")));
    }

    #[test]
    fn close_frames_keep_code_and_reason() {
        let forwarded = to_backend(Message::Close(Some(CloseFrame {
            code: close_code::AWAY,
            reason: "bye".into(),
        })));
        match forwarded {
            BackendMessage::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), close_code::AWAY);
                assert_eq!(frame.reason.as_str(), "bye");
            }
            other => panic!("unexpected {:?}", other),
        }

        match to_client(BackendMessage::Close(None)) {
            Some(Message::Close(None)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn state_machine_stops_at_terminal_states() {
        let mut bridge = Bridge::new("127.0.0.1:1".parse().unwrap());
        assert_eq!(bridge.state(), BridgeState::Idle);

        bridge.transition(BridgeState::AwaitingClientUpgrade);
        let err = bridge.fail(GatewayError::UpgradeHandshake("missing key".into()));
        assert!(matches!(err, GatewayError::UpgradeHandshake(_)));
        assert_eq!(bridge.state(), BridgeState::Failed);

        bridge.transition(BridgeState::Bridging);
        assert_eq!(bridge.state(), BridgeState::Failed);
    }

    #[test]
    fn backend_request_carries_forwarded_headers() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("cookie", "auth=abc".parse().unwrap());
        headers.insert("x-forwarded-for", "10.0.0.1:5555".parse().unwrap());

        let target: axum::http::Uri = "ws://127.0.0.1:8080/admin/api/command/?auth=t".parse().unwrap();
        let request = backend_request(&target, headers).unwrap();

        assert_eq!(request.uri(), &target);
        assert_eq!(request.headers()["cookie"], "auth=abc");
        assert_eq!(request.headers()["x-forwarded-for"], "10.0.0.1:5555");
        assert!(request.headers().contains_key("sec-websocket-key"));
    }
}
