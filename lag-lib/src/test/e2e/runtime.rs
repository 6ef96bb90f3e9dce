use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use rama::{
    Service,
    error::BoxError,
    http::{Request, Response},
};
use tokio::{sync::oneshot, task::JoinHandle};

use super::client;
use crate::{
    config::{ServerConfig, ServerSettings},
    server::{ShutdownOutcome, serve_until_shutdown},
};

/// A lag server running in-process on an ephemeral loopback port.
pub(super) struct Runtime {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<Result<ShutdownOutcome, BoxError>>,
}

impl Runtime {
    #[inline(always)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[inline(always)]
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    /// A new client, with its own connection pool.
    #[inline(always)]
    pub fn client(&self) -> impl Service<Request, Output = Response, Error = BoxError> {
        client::new_web_client()
    }

    /// Trigger the shutdown signal without waiting for the server to stop.
    pub fn begin_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).unwrap();
        }
    }

    pub async fn stopped(self) -> ShutdownOutcome {
        tokio::time::timeout(Duration::from_secs(30), self.server)
            .await
            .unwrap()
            .unwrap()
            .unwrap()
    }

    pub async fn shutdown(mut self) -> ShutdownOutcome {
        self.begin_shutdown();
        self.stopped().await
    }
}

pub(super) async fn spawn() -> Runtime {
    spawn_with_settings(ServerSettings::default()).await
}

pub(super) async fn spawn_with_settings(settings: ServerSettings) -> Runtime {
    let config = ServerConfig::try_from_settings(ServerSettings {
        host: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        port: Some(0),
        ..settings
    })
    .unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (addr_tx, addr_rx) = oneshot::channel();

    let server = tokio::spawn(serve_until_shutdown(
        config,
        async move {
            let _ = shutdown_rx.await;
        },
        Some(addr_tx),
    ));

    let bound = tokio::time::timeout(Duration::from_secs(10), addr_rx)
        .await
        .unwrap()
        .unwrap();
    let addr = SocketAddr::new(bound.ip_addr, bound.port);
    assert!(addr.ip().is_loopback());
    assert_ne!(0, addr.port());

    Runtime {
        addr,
        shutdown_tx: Some(shutdown_tx),
        server,
    }
}
