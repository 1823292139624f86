//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Derive the outbound header set from the inbound one
//! - Stamp `Host` and `X-Forwarded-For` on the copy
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The inbound header map is only ever read; all edits happen on a clone
//! - Multi-valued headers keep their order

use std::net::SocketAddr;

use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    Request,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Handshake headers regenerated by the backend-side WebSocket client.
const HANDSHAKE_HEADERS: [HeaderName; 8] = [
    header::HOST,
    header::CONNECTION,
    header::UPGRADE,
    header::CONTENT_LENGTH,
    header::SEC_WEBSOCKET_KEY,
    header::SEC_WEBSOCKET_VERSION,
    header::SEC_WEBSOCKET_EXTENSIONS,
    header::SEC_WEBSOCKET_PROTOCOL,
];

/// Issues a fresh UUID v4 for every request lacking an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of an inbound request, for log fields.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The host the caller addressed: `Host` header, else the URI authority (HTTP/2).
pub fn declared_host(parts: &Parts) -> Option<HeaderValue> {
    parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
    })
}

/// Build the outbound header set.
///
/// Every inbound name/value pair is copied; `Host` is replaced by the
/// declared host and `X-Forwarded-For` by the peer address.
pub fn rewrite_headers(inbound: &HeaderMap, host: Option<HeaderValue>, peer: SocketAddr) -> HeaderMap {
    let mut outbound = inbound.clone();
    if let Some(host) = host {
        outbound.insert(header::HOST, host);
    }
    if let Ok(forwarded) = HeaderValue::from_str(&peer.to_string()) {
        outbound.insert(X_FORWARDED_FOR, forwarded);
    }
    outbound
}

/// Outbound headers for the backend WebSocket handshake.
pub fn upgrade_headers(inbound: &HeaderMap, peer: SocketAddr) -> HeaderMap {
    let mut outbound = rewrite_headers(inbound, None, peer);
    for name in HANDSHAKE_HEADERS.iter() {
        outbound.remove(name);
    }
    outbound
}
