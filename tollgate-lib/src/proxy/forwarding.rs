use http::header::{HeaderValue, HOST};
use http::uri::{PathAndQuery, Scheme};
use http::{HeaderMap, Request, Response, Uri, Version};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::proxy::handler::broker::RouterHeaders;
use crate::proxy::handler::headers::{append_forwarded_for, strip_hop_by_hop, FORWARDED_URL};
use crate::proxy::http_result::{HttpError, HttpResult};
use crate::proxy::synthetic_response::RespBody;
use crate::proxy::UpstreamClient;
use crate::telemetry::Metrics;

/// Upstream URL named by the `X-Cf-Forwarded-Url` header.
///
/// The URL must be absolute with an `http` or `https` scheme.
pub fn forwarded_target(headers: &HeaderMap) -> HttpResult<Uri> {
    let raw = headers
        .get(FORWARDED_URL)
        .ok_or(HttpError::MissingForwardedUrl)?
        .to_str()
        .map_err(|e| HttpError::InvalidForwardedUrl(e.to_string()))?;

    let uri: Uri = raw
        .parse()
        .map_err(|e: http::uri::InvalidUri| HttpError::InvalidForwardedUrl(e.to_string()))?;

    match uri.scheme() {
        Some(scheme) if *scheme == Scheme::HTTP || *scheme == Scheme::HTTPS => {}
        _ => return Err(HttpError::InvalidForwardedUrl(format!("unsupported scheme in {raw}"))),
    }
    if uri.authority().is_none() {
        return Err(HttpError::InvalidForwardedUrl(format!("missing host in {raw}")));
    }

    Ok(uri)
}

/// Turn an inbound request into the request sent to `target`.
///
/// The inbound path is discarded: the upstream sees the forwarded URL's path
/// and query, a `Host` header matching its authority, and no hop-by-hop
/// headers. The client IP is appended to `X-Forwarded-For`.
pub fn build_upstream_request<B>(
    req: Request<B>,
    target: Uri,
    peer: SocketAddr,
    router_headers: Option<RouterHeaders>,
) -> HttpResult<Request<B>> {
    let (mut parts, body) = req.into_parts();

    let host = target
        .authority()
        .map(|a| a.as_str().to_string())
        .ok_or_else(|| HttpError::InvalidForwardedUrl(target.to_string()))?;
    let host = HeaderValue::from_str(&host)
        .map_err(|e| HttpError::FailedToGenerateUpstreamRequest(e.to_string()))?;

    let mut uri_parts = target.into_parts();
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = Uri::from_parts(uri_parts)
        .map_err(|e| HttpError::FailedToGenerateUpstreamRequest(e.to_string()))?;
    // The pooled client picks HTTP/2 through ALPN only
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    parts.headers.insert(HOST, host);
    append_forwarded_for(&mut parts.headers, peer);
    if let Some(router_headers) = router_headers {
        router_headers.restore(&mut parts.headers);
    }

    Ok(Request::from_parts(parts, body))
}

/// Send a prepared request upstream and relay the response
pub async fn forward(
    client: &UpstreamClient,
    req: Request<Incoming>,
    metrics: Option<&Metrics>,
) -> HttpResult<Response<RespBody>> {
    let start = Instant::now();
    let uri = req.uri().clone();
    debug!(%uri, "forwarding request upstream");

    match client.request(req).await {
        Ok(resp) => {
            let (mut parts, body) = resp.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            if let Some(m) = metrics {
                m.record_upstream(parts.status.as_u16(), start.elapsed().as_secs_f64());
            }
            Ok(Response::from_parts(parts, body.boxed()))
        }
        Err(e) => {
            warn!(%uri, error = %e, "upstream request failed");
            let error = HttpError::UpstreamFailed(e.to_string());
            if let Some(m) = metrics {
                m.record_upstream_error(error.error_type());
            }
            Err(error)
        }
    }
}
