//! Brokered route service mode.
//!
//! When the gateway is bound as a brokered route service the router calls
//! `/service-instance/<service-instance-id>/bind-instance/<binding-id>/...`
//! and expects the proxy signature and metadata headers to reach the
//! upstream untouched.

use http::HeaderMap;

use super::headers::{PROXY_METADATA, PROXY_SIGNATURE};

pub const PATH_PREFIX: &str = "/service-instance/";

/// Instance identifiers carried in a brokered request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRoute<'a> {
    pub service_instance: &'a str,
    pub bind_instance: &'a str,
}

impl<'a> BrokerRoute<'a> {
    /// Parse `/service-instance/<id>/bind-instance/<id>[/...]`
    pub fn parse(path: &'a str) -> Option<Self> {
        let mut segments = path.strip_prefix(PATH_PREFIX)?.split('/');
        let service_instance = segments.next().filter(|s| !s.is_empty())?;
        if segments.next()? != "bind-instance" {
            return None;
        }
        let bind_instance = segments.next().filter(|s| !s.is_empty())?;
        Some(Self { service_instance, bind_instance })
    }
}

/// Router headers the upstream must receive unchanged
#[derive(Debug, Clone, Default)]
pub struct RouterHeaders(HeaderMap);

impl RouterHeaders {
    pub fn capture(headers: &HeaderMap) -> Self {
        let mut kept = HeaderMap::new();
        for name in [PROXY_SIGNATURE, PROXY_METADATA] {
            if let Some(value) = headers.get(name) {
                kept.insert(name, value.clone());
            }
        }
        Self(kept)
    }

    /// Put the captured headers back, after anything that may have removed them
    pub fn restore(self, headers: &mut HeaderMap) {
        for (name, value) in self.0 {
            if let Some(name) = name {
                headers.insert(name, value);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    #[test]
    fn parses_instance_ids() {
        let route = BrokerRoute::parse("/service-instance/svc-1/bind-instance/bind-9/extra/path");
        assert_eq!(
            route,
            Some(BrokerRoute { service_instance: "svc-1", bind_instance: "bind-9" })
        );
    }

    #[test]
    fn rejects_incomplete_paths() {
        assert_eq!(BrokerRoute::parse("/service-instance/svc-1"), None);
        assert_eq!(BrokerRoute::parse("/service-instance/svc-1/other/bind"), None);
        assert_eq!(BrokerRoute::parse("/service-instance//bind-instance/b"), None);
        assert_eq!(BrokerRoute::parse("/stats"), None);
    }

    #[test]
    fn router_headers_survive_removal() {
        let mut headers = HeaderMap::new();
        headers.insert(PROXY_SIGNATURE, HeaderValue::from_static("sig"));
        headers.insert(PROXY_METADATA, HeaderValue::from_static("meta"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        let captured = RouterHeaders::capture(&headers);
        headers.clear();
        captured.restore(&mut headers);

        assert_eq!(headers.get(PROXY_SIGNATURE), Some(&HeaderValue::from_static("sig")));
        assert_eq!(headers.get(PROXY_METADATA), Some(&HeaderValue::from_static("meta")));
        assert!(!headers.contains_key("accept"));
    }
}
