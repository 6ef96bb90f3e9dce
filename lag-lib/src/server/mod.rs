//! Server lifecycle: bind, serve until the shutdown signal, then drain.

use std::{sync::Arc, time::Duration};

use rama::{
    Layer as _,
    error::{BoxError, ErrorContext as _},
    graceful,
    http::{
        HeaderValue,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
    },
    layer::TimeoutLayer,
    net::{address::SocketAddress, socket::Interface},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing::{self, Instrument as _},
};
use tokio::sync::oneshot;

use crate::{config::ServerConfig, http::LagService, utils};

/// How the server stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All in-flight requests finished within the graceful timeout.
    Graceful(Duration),
    /// The graceful timeout elapsed, remaining connections were abandoned.
    Forced(Duration),
}

/// Serve `config` until `shutdown_signal` resolves, then shut down gracefully.
///
/// Every request is bounded by the transport timeout, counted from the
/// moment the request is received, so a keep-alive connection can outlive it.
///
/// Bind failures are returned as an error. The bound address is sent to
/// `bound_addr_tx` if given, which is useful when binding port `0`.
pub async fn serve_until_shutdown<F>(
    config: ServerConfig,
    shutdown_signal: F,
    bound_addr_tx: Option<oneshot::Sender<SocketAddress>>,
) -> Result<ShutdownOutcome, BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let config = Arc::new(config);
    let graceful = graceful::Shutdown::new(new_shutdown_signal(shutdown_signal));

    let interface: Interface = config
        .address
        .to_string()
        .parse()
        .context("parse server bind interface")?;

    let exec = Executor::graceful(graceful.guard());
    let tcp_listener = TcpListener::bind(interface, exec.clone())
        .await
        .context("bind lag http server")?;

    let server_addr: SocketAddress = tcp_listener
        .local_addr()
        .context("get bound address for lag http server")?
        .into();
    tracing::info!("lag http server bound to: {server_addr}");

    if let Some(tx) = bound_addr_tx
        && tx.send(server_addr).is_err()
    {
        tracing::debug!("bound address receiver dropped before server started");
    }

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(utils::env::server_identifier())),
        TimeoutLayer::new(config.transport_timeout),
    )
        .into_layer(LagService::new(config.clone()));

    let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));

    graceful.spawn_task_fn(move |_guard| {
        tcp_listener.serve(http_server).instrument(tracing::debug_span!(
            "lag server lifetime",
            server.service.name = utils::env::project_name(),
            otel.kind = "server",
            network.protocol.name = "http",
        ))
    });

    let outcome = match config.graceful_timeout {
        Some(limit) => match graceful.shutdown_with_limit(limit).await {
            Ok(elapsed) => ShutdownOutcome::Graceful(elapsed),
            Err(err) => {
                tracing::warn!(
                    "graceful shutdown limit of {limit:?} reached, abandon in-flight requests: {err}"
                );
                ShutdownOutcome::Forced(limit)
            }
        },
        None => ShutdownOutcome::Graceful(graceful.shutdown().await),
    };

    if let ShutdownOutcome::Graceful(elapsed) = outcome {
        tracing::info!("gracefully shutdown with a delay of: {elapsed:?}");
    }
    Ok(outcome)
}

fn new_shutdown_signal(
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        base_shutdown_signal.await;
        tracing::info!("shutdown signal received: stop accepting connections and drain");
    }
}
