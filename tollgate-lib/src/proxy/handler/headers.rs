use http::header::{HeaderName, HeaderValue, CONNECTION};
use http::HeaderMap;
use std::net::SocketAddr;

/// Header carrying the upstream URL the request is really meant for
pub const FORWARDED_URL: &str = "x-cf-forwarded-url";

/// Router signature that a brokered route service must send back upstream
pub const PROXY_SIGNATURE: &str = "x-cf-proxy-signature";

/// Router metadata that a brokered route service must send back upstream
pub const PROXY_METADATA: &str = "x-cf-proxy-metadata";

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that only apply to a single connection and are never forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Append the client IP to X-Forwarded-For, or create it
pub fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let client_ip = peer.ip().to_string();
    let value = match headers.get(FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip,
    };
    if let Ok(header_value) = HeaderValue::from_str(&value) {
        headers.insert(FORWARDED_FOR, header_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from(([192, 168, 1, 7], 40123))
    }

    #[test]
    fn forwarded_for_is_created() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, peer());
        assert_eq!(headers.get(FORWARDED_FOR), Some(&HeaderValue::from_static("192.168.1.7")));
    }

    #[test]
    fn forwarded_for_is_appended() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));
        append_forwarded_for(&mut headers, peer());
        assert_eq!(
            headers.get(FORWARDED_FOR),
            Some(&HeaderValue::from_static("10.0.0.1, 192.168.1.7"))
        );
    }

    #[test]
    fn hop_by_hop_and_connection_listed_headers_are_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert("upgrade", HeaderValue::from_static("websocket"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("accept"));
    }
}
