//! Raw TCP gateway, end to end.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use filegate::config::ForwarderConfig;
use filegate::lifecycle::Shutdown;
use filegate::TcpGateway;

mod common;

async fn spawn_forwarder(backend: SocketAddr) -> (SocketAddr, Shutdown, tokio::task::JoinHandle<()>) {
    let config = ForwarderConfig {
        bind_address: "127.0.0.1:0".into(),
        backend_address: backend.to_string(),
        max_connections: 16,
    };
    let gateway = TcpGateway::bind(&config, Duration::from_secs(2)).await.unwrap();
    let addr = gateway.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        gateway.run(rx).await.unwrap();
    });
    (addr, shutdown, handle)
}

#[tokio::test]
async fn bytes_round_trip_through_backend() {
    let backend = common::start_tcp_echo().await;
    let (addr, shutdown, _handle) = spawn_forwarder(backend).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();

    let data: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();
    let outgoing = data.clone();
    let write = tokio::spawn(async move {
        writer.write_all(&outgoing).await.unwrap();
        writer
    });

    let mut received = vec![0u8; data.len()];
    timeout(common::PATIENCE, reader.read_exact(&mut received)).await.unwrap().unwrap();
    assert_eq!(received, data);

    let mut writer = write.await.unwrap();
    writer.shutdown().await.unwrap();

    let mut rest = Vec::new();
    let n = timeout(common::PATIENCE, reader.read_to_end(&mut rest)).await.unwrap().unwrap();
    assert_eq!(n, 0);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_closes_only_that_caller() {
    let backend = common::unused_addr().await;
    let (addr, shutdown, _handle) = spawn_forwarder(backend).await;

    for _ in 0..3 {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        let read = timeout(common::PATIENCE, stream.read(&mut buf)).await.unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let backend = common::start_tcp_echo().await;
    let (_addr, shutdown, handle) = spawn_forwarder(backend).await;

    shutdown.trigger();
    timeout(common::PATIENCE, handle).await.unwrap().unwrap();
}
