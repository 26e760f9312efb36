use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::proxy::forwarding::{build_upstream_request, forward, forwarded_target};
use crate::proxy::handler::broker::{BrokerRoute, RouterHeaders, PATH_PREFIX};
use crate::proxy::handler::config::config_response;
use crate::proxy::handler::stats::stats_response;
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::{below_percentage, too_many_requests, RespBody};
use crate::proxy::GatewayContext;
use crate::security::{client_key, AdmissionDecision};

/// How a request path is served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Stats,
    Config,
    Brokered,
    Simple,
}

impl Route {
    pub fn for_path(path: &str) -> Self {
        match path {
            "/stats" => Route::Stats,
            "/config" => Route::Config,
            p if p.starts_with(PATH_PREFIX) => Route::Brokered,
            _ => Route::Simple,
        }
    }

    /// Label used for the `mode` metric attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Stats => "stats",
            Route::Config => "config",
            Route::Brokered => "brokered",
            Route::Simple => "simple",
        }
    }
}

/// Serve one inbound request
pub async fn handle_request(
    req: Request<Incoming>,
    ctx: &GatewayContext,
    peer: SocketAddr,
) -> HttpResult<Response<RespBody>> {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = Route::for_path(req.uri().path());

    let result = match route {
        Route::Stats => stats_response(&ctx.live),
        Route::Config => config_response(&ctx.live, req.uri().query(), ctx.metrics.as_deref()),
        Route::Brokered | Route::Simple => proxy_request(req, ctx, peer, route).await,
    };

    if let Some(ref m) = ctx.metrics {
        let status_code = match &result {
            Ok(resp) => resp.status().as_u16(),
            Err(e) => {
                m.record_error(e.error_type());
                http::StatusCode::from(e).as_u16()
            }
        };
        m.record_request(&method, status_code, route.as_str(), start.elapsed().as_secs_f64());
    }

    result
}

async fn proxy_request(
    req: Request<Incoming>,
    ctx: &GatewayContext,
    peer: SocketAddr,
    route: Route,
) -> HttpResult<Response<RespBody>> {
    let key = client_key(peer);
    info!(client = %key, "request from client");

    let router_headers = if route == Route::Brokered {
        match BrokerRoute::parse(req.uri().path()) {
            Some(ids) => info!(
                service_instance = ids.service_instance,
                bind_instance = ids.bind_instance,
                "brokered request"
            ),
            None => warn!(path = req.uri().path(), "brokered request without instance ids"),
        }
        Some(RouterHeaders::capture(req.headers()))
    } else {
        None
    };

    let target = forwarded_target(req.headers()).inspect_err(|e: &HttpError| {
        warn!(client = %key, error = %e, "cannot forward request");
    })?;

    if let Some(ref m) = ctx.metrics {
        m.record_delay(ctx.live.settings().delay_ms);
    }
    let decision = ctx.policy.admit(&key).await;
    if let Some(ref m) = ctx.metrics {
        m.record_admission(decision.reason(), route.as_str());
    }

    match decision {
        AdmissionDecision::TooManyRequests => {
            info!(client = %key, "Too many requests");
            return too_many_requests();
        }
        AdmissionDecision::BelowPercentage => {
            info!(client = %key, "Requests below than percentage");
            return below_percentage();
        }
        AdmissionDecision::Admitted { remaining } => {
            debug!(client = %key, remaining, "request admitted");
        }
    }

    let upstream = build_upstream_request(req, target, peer, router_headers)?;
    forward(&ctx.client, upstream, ctx.metrics.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_path() {
        assert_eq!(Route::for_path("/stats"), Route::Stats);
        assert_eq!(Route::for_path("/config"), Route::Config);
        assert_eq!(Route::for_path("/service-instance/a/bind-instance/b"), Route::Brokered);
        assert_eq!(Route::for_path("/"), Route::Simple);
        assert_eq!(Route::for_path("/stats/extra"), Route::Simple);
        assert_eq!(Route::for_path("/service-instance"), Route::Simple);
    }
}
