//! Backend target.
//!
//! # Responsibilities
//! - Represent the single wrapped backend service
//! - Pre-compute its HTTP and WebSocket origins
//! - Rewrite inbound request URIs onto those origins

use axum::http::Uri;
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// The file-management backend behind the gateway.
#[derive(Debug, Clone)]
pub struct Backend {
    /// Backend authority (host:port).
    address: String,
    /// Pre-calculated `http://` origin.
    http_origin: String,
    /// Pre-calculated `ws://` origin.
    ws_origin: String,
}

impl Backend {
    pub fn new(address: &str) -> GatewayResult<Self> {
        let mut url = Url::parse(&format!("http://{}", address))
            .map_err(|e| GatewayError::InvalidBackend(format!("{}: {}", address, e)))?;
        if url.host_str().is_none() || url.path() != "/" {
            return Err(GatewayError::InvalidBackend(address.to_string()));
        }
        let http_origin = url.origin().ascii_serialization();
        url.set_scheme("ws")
            .map_err(|_| GatewayError::InvalidBackend(address.to_string()))?;
        let ws_origin = url.origin().ascii_serialization();

        Ok(Self {
            address: address.to_string(),
            http_origin,
            ws_origin,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Same path and query as `inbound`, on the backend's HTTP origin.
    pub fn http_uri(&self, inbound: &Uri) -> GatewayResult<Uri> {
        rebase(&self.http_origin, inbound)
    }

    /// Same path and query as `inbound`, on the backend's WebSocket origin.
    pub fn ws_uri(&self, inbound: &Uri) -> GatewayResult<Uri> {
        rebase(&self.ws_origin, inbound)
    }
}

fn rebase(origin: &str, inbound: &Uri) -> GatewayResult<Uri> {
    let path_and_query = inbound
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}{}", origin, path_and_query)
        .parse()
        .map_err(|e| GatewayError::InvalidBackend(format!("{}{}: {}", origin, path_and_query, e)))
}
