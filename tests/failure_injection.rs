//! Failure injection tests for the handler lifecycle.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use rpc_mux::{Framework, Handler, HandlerError, MuxListener};
use tokio::io::AsyncReadExt;
use tokio::time::timeout;

mod common;

/// A framework whose serve loop dies right away with a fixed error.
struct BrokenFramework {
    kind: io::ErrorKind,
}

impl Framework for BrokenFramework {
    type Error = io::Error;

    fn serve(&self, _listener: MuxListener) -> impl Future<Output = io::Result<()>> + Send {
        let kind = self.kind;
        async move { Err(io::Error::new(kind, "accept loop crashed")) }
    }

    fn stop(&self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn serve_failure_is_returned_unchanged() {
    let handler = Handler::new(
        true,
        common::dispatcher_addr(),
        BrokenFramework {
            kind: io::ErrorKind::AddrInUse,
        },
    );

    let err = timeout(common::WAIT, handler.run()).await.unwrap().unwrap_err();
    match err {
        HandlerError::Serve(e) => {
            assert_eq!(e.kind(), io::ErrorKind::AddrInUse);
            assert_eq!(e.to_string(), "accept loop crashed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn dead_server_does_not_strand_the_dispatcher() {
    let handler = Arc::new(Handler::new(
        true,
        common::dispatcher_addr(),
        BrokenFramework {
            kind: io::ErrorKind::Other,
        },
    ));
    assert!(handler.run().await.is_err());

    // The listener went away with the serve loop, so handle gives up at once.
    let (conn, mut client) = common::duplex_connection(42001);
    timeout(common::WAIT, handler.handle(conn)).await.unwrap();

    let mut buf = [0u8; 1];
    assert_eq!(client.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn shutdown_releases_every_waiting_dispatcher() {
    let (handler, running) = common::start_rpc_handler(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    handler.shutdown().unwrap();
    timeout(common::WAIT, running).await.unwrap().unwrap().unwrap();

    let mut waiting = Vec::new();
    let mut clients = Vec::new();
    for port in 0..4 {
        let (conn, client) = common::duplex_connection(43000 + port);
        clients.push(client);
        let handler = Arc::clone(&handler);
        waiting.push(tokio::spawn(async move { handler.handle(conn).await }));
    }

    for task in waiting {
        timeout(common::WAIT, task).await.unwrap().unwrap();
    }
    for mut client in clients {
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn run_is_single_use() {
    let (handler, running) = common::start_rpc_handler(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = timeout(common::WAIT, handler.run()).await.unwrap();
    assert!(matches!(second, Err(HandlerError::AlreadyStarted { .. })));

    handler.shutdown().unwrap();
    assert!(timeout(common::WAIT, running).await.unwrap().unwrap().is_ok());
}
