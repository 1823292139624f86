//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to configured address(es)
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//!
//! A bind failure is the only fatal error in the gateway; accept errors are
//! reported to the caller, which logs and keeps going.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{GatewayError, GatewayResult};

/// Bind a plain TCP listener, mapping failure to [`GatewayError::Listen`].
pub async fn bind(address: &str) -> GatewayResult<TcpListener> {
    let listen_error = |source| GatewayError::Listen {
        address: address.to_string(),
        source,
    };

    let addr: SocketAddr = address
        .parse()
        .map_err(|e| listen_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    TcpListener::bind(addr).await.map_err(listen_error)
}

/// A bounded TCP listener that limits concurrent connections.
///
/// When the limit is reached, `accept` waits until a permit is returned.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind to `address`, allowing at most `max_connections` live connections.
    pub async fn bind(address: &str, max_connections: usize) -> GatewayResult<Self> {
        let inner = bind(address).await?;
        let local_addr = inner.local_addr()?;

        tracing::info!(address = %local_addr, max_connections, "Listener bound");

        Ok(Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// The returned permit must be held for the connection's lifetime.
    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        // The semaphore is owned here and never closed.
        let permit = Arc::clone(&self.connection_limit)
            .acquire_owned()
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let (stream, addr) = self.inner.accept().await?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A connection slot, released when dropped (even if the handler panics).
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
