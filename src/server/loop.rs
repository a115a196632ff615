// Server loop module
// Accepts connections until shutdown is requested, then drains them

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::connection::{handle_connection, ConnectionContext};
use super::limit::ConnectionLimit;
use crate::logger::{events, Fields};

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Connections still being served when the accept loop ends
pub struct Draining {
    graceful: GracefulShutdown,
    connections: JoinSet<()>,
}

impl Draining {
    /// Let in-flight requests finish within `grace`; connections still open
    /// afterwards are aborted. Returns whether every connection finished.
    pub async fn drain(self, grace: Duration) -> bool {
        let Self {
            graceful,
            mut connections,
        } = self;
        let finished = tokio::time::timeout(grace, async {
            graceful.shutdown().await;
            // Tasks still in the TLS handshake are not watched yet
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_ok();
        if !finished {
            connections.shutdown().await;
        }
        finished
    }
}

/// Resolves once shutdown is requested or the sender is gone.
///
/// The borrowed value is dropped here so the accept loop stays `Send`.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Accept connections until `shutdown` flips to true.
///
/// A concurrency slot is taken before each accept, so when the limit is
/// reached further clients wait in the listen backlog. The listener is
/// closed when this returns.
pub async fn accept_loop(
    listener: TcpListener,
    limit: ConnectionLimit,
    ctx: Arc<ConnectionContext>,
    mut shutdown: watch::Receiver<bool>,
) -> Draining {
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        let slot = tokio::select! {
            slot = limit.acquire() => slot,
            _ = stopped(&mut shutdown) => break,
        };

        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            Arc::clone(&ctx),
                            graceful.watcher(),
                            slot,
                        ));
                    }
                    Err(e) => {
                        ctx.pipeline.logger().error(
                            ctx.pipeline.event(events::ACCEPT_ERROR),
                            "Failed to accept connection",
                            &Fields::new().with("error", e),
                        );
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }

            _ = stopped(&mut shutdown) => break,
        }

        // Reap finished connection tasks
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    Draining {
        graceful,
        connections,
    }
}
