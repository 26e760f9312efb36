//! Shared helpers for gateway integration tests

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tollgate_lib::config::UpstreamConfig;
use tollgate_lib::{AdmissionSettings, GatewayContext, LiveConfig, UpstreamClient};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const ECHO_HOST: &str = "x-echo-host";
pub const ECHO_FORWARDED_FOR: &str = "x-echo-forwarded-for";
pub const ECHO_SIGNATURE: &str = "x-echo-signature";
pub const ECHO_METADATA: &str = "x-echo-metadata";

fn echo(req: &Request<Incoming>, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Start a plain HTTP backend that answers with the request path and query
/// in the body and reflects selected request headers as `x-echo-*` headers
pub async fn start_backend() -> Result<(JoinHandle<()>, SocketAddr), BoxError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let svc = service_fn(|req: Request<Incoming>| async move {
                    let body = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_default();
                    let resp = Response::builder()
                        .header(ECHO_HOST, echo(&req, "host"))
                        .header(ECHO_FORWARDED_FOR, echo(&req, "x-forwarded-for"))
                        .header(ECHO_SIGNATURE, echo(&req, "x-cf-proxy-signature"))
                        .header(ECHO_METADATA, echo(&req, "x-cf-proxy-metadata"))
                        .body(Full::new(Bytes::from(body)))
                        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));
                    Ok::<_, Infallible>(resp)
                });
                let _ = ConnBuilder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    Ok((handle, addr))
}

/// A gateway served on an ephemeral local port
pub struct Gateway {
    pub addr: SocketAddr,
    pub ctx: Arc<GatewayContext>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<tollgate_lib::Result<()>>,
}

impl Gateway {
    pub async fn start(settings: AdmissionSettings) -> Result<Self, BoxError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let live = Arc::new(LiveConfig::new(settings));
        let client = UpstreamClient::new(&UpstreamConfig::default())?;
        let ctx = Arc::new(GatewayContext::new(live, client, None));

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(tollgate_lib::serve(
            listener,
            Arc::clone(&ctx),
            Duration::from_millis(200),
            async {
                let _ = rx.await;
            },
        ));

        Ok(Self { addr, ctx, shutdown: Some(tx), task })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(mut self) -> Result<(), BoxError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await??;
        Ok(())
    }
}

/// Settings with a slow refill so buckets do not recover during a test
pub fn settings(limit: u32, percentage: u8) -> AdmissionSettings {
    AdmissionSettings { limit, delay_ms: 0, window_ms: 60_000, percentage }
}

pub fn http_client() -> Result<reqwest::Client, BoxError> {
    Ok(reqwest::Client::builder().no_proxy().build()?)
}
