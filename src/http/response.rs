//! Response relay.
//!
//! # Responsibilities
//! - Pass the backend status through
//! - Copy backend headers additively, with one override
//! - Stream the backend body unchanged
//!
//! # Design Decisions
//! - The backend mis-reports `Content-Type` for stylesheets, so a request
//!   whose extension maps to `text/css` gets exactly one `text/css` value
//! - Streaming responses avoid buffering the entire body; the backend body
//!   is dropped (and its connection released) with the exchange

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response},
};

const TEXT_CSS: &str = "text/css";

/// True if the requested path names a stylesheet.
pub fn is_stylesheet(path: &str) -> bool {
    mime_guess::from_path(path)
        .first_raw()
        .map(|mime| mime == TEXT_CSS)
        .unwrap_or(false)
}

/// Build the caller-facing header set from the backend's.
pub fn relay_headers(requested_path: &str, backend: &HeaderMap) -> HeaderMap {
    let force_css = is_stylesheet(requested_path);
    let mut outbound = HeaderMap::with_capacity(backend.len());

    for name in backend.keys() {
        for value in backend.get_all(name) {
            if force_css && name == header::CONTENT_TYPE {
                outbound.insert(name.clone(), HeaderValue::from_static(TEXT_CSS));
                break;
            }
            outbound.append(name.clone(), value.clone());
        }
    }
    outbound
}

/// Relay a backend response to the caller.
pub fn relay(requested_path: &str, backend: Response<Body>) -> Response<Body> {
    let (parts, body) = backend.into_parts();
    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    *response.headers_mut() = relay_headers(requested_path, &parts.headers);
    response
}
