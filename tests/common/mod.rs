//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use rpc_mux::config::RpcConfig;
use rpc_mux::{Connection, Handler, HandlerError, RpcServer};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn dispatcher_addr() -> SocketAddr {
    "127.0.0.1:8300".parse().unwrap()
}

/// A connection whose far end is returned for the test to drive.
pub fn duplex_connection(peer_port: u16) -> (Connection, DuplexStream) {
    let (client, server) = tokio::io::duplex(16 * 1024);
    let conn = Connection::new(server, SocketAddr::from(([10, 0, 0, 2], peer_port)));
    (conn, client)
}

/// Spawn `run` for a freshly built RPC handler.
#[allow(dead_code)]
pub fn start_rpc_handler(
    enabled: bool,
) -> (
    Arc<Handler<RpcServer>>,
    JoinHandle<Result<(), HandlerError<std::io::Error>>>,
) {
    let handler = Arc::new(Handler::new(
        enabled,
        dispatcher_addr(),
        RpcServer::new(&RpcConfig::default()),
    ));
    let running = tokio::spawn({
        let handler = Arc::clone(&handler);
        async move { handler.run().await }
    });
    (handler, running)
}

/// Issue `GET /v1/status` over `io` with an HTTP/1 client.
#[allow(dead_code)]
pub async fn get_status<T>(io: T) -> (StatusCode, serde_json::Value)
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .unwrap();
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let request = Request::get("/v1/status")
        .header("host", "rpc.local")
        .body(Body::empty())
        .unwrap();
    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
