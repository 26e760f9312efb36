use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::proxy::connection::ConnectionGuard;
use crate::proxy::handler::handle_request;
use crate::proxy::synthetic_response::error_response;
use crate::proxy::GatewayContext;

/// Bind the configured address and serve until SIGTERM or SIGINT
pub async fn run(config: Arc<Config>, ctx: Arc<GatewayContext>) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(GatewayError::Io)?;

    let settings = ctx.live.settings();
    info!(
        limit = settings.limit,
        delay_ms = settings.delay_ms,
        window_ms = settings.window_ms,
        percentage = settings.percentage,
        skip_tls_verification = ctx.client.skips_tls_verification(),
        "admission settings"
    );

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        GatewayError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        GatewayError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    };

    serve(listener, ctx, Duration::from_secs(config.timeout.shutdown_secs), shutdown).await
}

/// Accept connections on `listener` until `shutdown` resolves, then wait up
/// to `shutdown_timeout` for in-flight connections to finish
pub async fn serve<F>(
    listener: TcpListener,
    ctx: Arc<GatewayContext>,
    shutdown_timeout: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr().map_err(GatewayError::Io)?;
    let builder = ConnBuilder::new(TokioExecutor::new());

    let active_connections = Arc::new(AtomicUsize::new(0));
    let (closed_tx, mut closed_rx) = watch::channel(());

    info!(?addr, "starting gateway (h1/h2)");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                if let Some(ref m) = ctx.metrics {
                    m.connections_total.add(1, &[]);
                }
                let guard = ConnectionGuard::acquire(
                    Arc::clone(&active_connections),
                    closed_tx.clone(),
                    ctx.metrics.as_ref().map(|m| m.connections_active.clone()),
                );

                let builder = builder.clone();
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    let _guard = guard;
                    serve_connection(builder, stream, peer, ctx).await;
                });
            }
        }
    }

    drop(listener);
    closed_rx.mark_unchanged();

    let active = active_connections.load(Ordering::Relaxed);
    if active > 0 {
        info!(
            active_connections = active,
            "Waiting for active connections to finish (timeout: {}s)",
            shutdown_timeout.as_secs()
        );
        let drained = async {
            while active_connections.load(Ordering::Relaxed) > 0 {
                if closed_rx.changed().await.is_err() {
                    break;
                }
            }
        };
        if tokio::time::timeout(shutdown_timeout, drained).await.is_err() {
            let active = active_connections.load(Ordering::Relaxed);
            warn!(active_connections = active, "Shutdown timeout reached, {} connections still active", active);
        }
    }

    info!("Gateway stopped");
    Ok(())
}

async fn serve_connection(
    builder: ConnBuilder<TokioExecutor>,
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    ctx: Arc<GatewayContext>,
) {
    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let ctx = Arc::clone(&ctx);
        async move {
            let resp = match handle_request(req, &ctx, peer).await {
                Ok(resp) => resp,
                Err(e) => error_response(&e),
            };
            Ok::<_, hyper::Error>(resp)
        }
    });

    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
        warn!(?peer, error = %e, "serve_connection error");
    }
}
