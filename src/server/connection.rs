// Connection module
// Serves one accepted TCP (or TLS) connection over HTTP/1.1

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::Watcher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

use super::dispatch::Dispatcher;
use super::limit::Slot;
use crate::handler::Pipeline;
use crate::logger::{events, Fields};

/// Everything a connection task needs, shared by all connections
pub struct ConnectionContext {
    pub dispatcher: Dispatcher,
    pub pipeline: Arc<Pipeline>,
    pub tls: Option<TlsAcceptor>,
    /// Bounds the TLS handshake
    pub read_timeout: Duration,
    /// Bounds the wait for the next request's headers on a kept-alive connection
    pub idle_timeout: Duration,
}

/// Handle a single connection until the peer closes it, a timeout fires or
/// graceful shutdown completes it.
///
/// # Arguments
///
/// * `stream` - The accepted TCP stream
/// * `peer` - The peer's socket address
/// * `ctx` - Shared connection context
/// * `watcher` - Graceful shutdown watcher for this connection
/// * `slot` - Concurrency slot, released when the connection ends
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<ConnectionContext>,
    watcher: Watcher,
    slot: Slot,
) {
    let _slot = slot;

    let Some(acceptor) = &ctx.tls else {
        serve_connection(TokioIo::new(stream), peer, &ctx, watcher).await;
        return;
    };

    match tokio::time::timeout(ctx.read_timeout, acceptor.accept(stream)).await {
        Ok(Ok(tls_stream)) => serve_connection(TokioIo::new(tls_stream), peer, &ctx, watcher).await,
        Ok(Err(err)) => {
            ctx.pipeline.logger().warning(
                ctx.pipeline.event(events::TLS_HANDSHAKE),
                "TLS handshake failed",
                &Fields::new().with("peer", peer).with("error", err),
            );
        }
        Err(_) => {
            ctx.pipeline.logger().warning(
                ctx.pipeline.event(events::TLS_HANDSHAKE),
                "TLS handshake timed out",
                &Fields::new()
                    .with("peer", peer)
                    .with("timeout", format!("{:?}", ctx.read_timeout)),
            );
        }
    }
}

async fn serve_connection<I>(
    io: TokioIo<I>,
    peer: SocketAddr,
    ctx: &Arc<ConnectionContext>,
    watcher: Watcher,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Build HTTP/1 connection with keep-alive support
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(true)
        .header_read_timeout(ctx.idle_timeout);

    let service_ctx = Arc::clone(ctx);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req| {
            let ctx = Arc::clone(&service_ctx);
            async move { ctx.dispatcher.dispatch(req, peer).await }
        }),
    );

    if let Err(err) = watcher.watch(conn).await {
        let fields = Fields::new().with("peer", peer).with("error", &err);
        let event = ctx.pipeline.event(events::CONNECTION_ERROR);
        // Idle keep-alive connections end through the header read timeout
        if err.is_timeout() {
            ctx.pipeline.logger().debug(event, "Connection timed out", &fields);
        } else {
            ctx.pipeline.logger().warning(event, "Connection error", &fields);
        }
    }
}
