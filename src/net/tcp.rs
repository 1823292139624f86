//! Raw TCP gateway: accept, dial the backend, relay bytes.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::ForwarderConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::net::connection::{PairState, PairTracker};
use crate::net::listener::{ConnectionPermit, Listener};
use crate::net::relay::forward;
use crate::observability::metrics;

/// How long live pairs get to finish once shutdown stops the accept loop.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

/// Listens for raw TCP connections and pairs each with a backend connection.
pub struct TcpGateway {
    listener: Listener,
    backend_address: String,
    connect_timeout: Duration,
    pairs: PairTracker,
}

impl TcpGateway {
    /// Bind the forwarding listener. Fails only if the address cannot be bound.
    pub async fn bind(config: &ForwarderConfig, connect_timeout: Duration) -> GatewayResult<Self> {
        let listener = Listener::bind(&config.bind_address, config.max_connections).await?;
        Ok(Self {
            listener,
            backend_address: config.backend_address.clone(),
            connect_timeout,
            pairs: PairTracker::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until shutdown. Each connection is handled on its own task.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> GatewayResult<()> {
        tracing::info!(
            address = %self.listener.local_addr()?,
            backend = %self.backend_address,
            "TCP gateway starting"
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let backend = self.backend_address.clone();
                        let pairs = self.pairs.clone();
                        let timeout = self.connect_timeout;
                        tokio::spawn(handle_connection(stream, peer, permit, backend, timeout, pairs));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("TCP gateway received shutdown signal");
                    break;
                }
            }
        }

        if !self.pairs.wait_idle(DRAIN_DEADLINE).await {
            tracing::warn!(active = self.pairs.active_count(), "TCP gateway stopped with pairs still open");
        }
        tracing::info!("TCP gateway stopped");
        Ok(())
    }
}

async fn handle_connection(
    caller: TcpStream,
    peer: SocketAddr,
    _permit: ConnectionPermit,
    backend_address: String,
    connect_timeout: Duration,
    pairs: PairTracker,
) {
    let mut pair = pairs.track();
    let pair_id = pair.id();

    let backend = match dial(&backend_address, connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(pair_id = %pair_id, peer = %peer, error = %e, "Backend dial failed, closing caller");
            metrics::record_forwarded_connection("dial_failed");
            pair.set_state(PairState::Closed);
            return;
        }
    };

    pair.set_state(PairState::Relaying);
    tracing::debug!(pair_id = %pair_id, peer = %peer, backend = %backend_address, "Relaying");

    match forward(caller, backend).await {
        Ok(outcome) => {
            metrics::record_forwarded_connection("completed");
            tracing::debug!(
                pair_id = %pair_id,
                upstream_bytes = outcome.upstream_bytes,
                downstream_bytes = outcome.downstream_bytes,
                "Pair closed"
            );
        }
        Err(e) => {
            metrics::record_forwarded_connection("relay_error");
            tracing::debug!(pair_id = %pair_id, error = %e, "Pair closed with error");
        }
    }
    pair.set_state(PairState::Closed);
}

async fn dial(address: &str, connect_timeout: Duration) -> GatewayResult<TcpStream> {
    match tokio::time::timeout(connect_timeout, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(GatewayError::dial(address, e)),
        Err(_) => Err(GatewayError::dial(address, "connect timed out")),
    }
}
