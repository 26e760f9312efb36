use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tracing::warn;

use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};

pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Incoming>;

/// Pooled client used for every forwarded request.
///
/// Upstreams are reached over plain HTTP or HTTPS depending on the forwarded
/// URL scheme. HTTPS upstreams negotiate HTTP/2 or HTTP/1.1 through ALPN.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: HttpsClient,
    skip_tls_verification: bool,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("skip_tls_verification", &self.skip_tls_verification)
            .finish()
    }
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let provider = Arc::new(crypto::aws_lc_rs::default_provider());

        let builder = if config.skip_tls_verification {
            warn!("Upstream TLS certificate verification is disabled");
            let tls = ClientConfig::builder_with_provider(Arc::clone(&provider))
                .with_safe_default_protocol_versions()
                .map_err(|e| GatewayError::Tls(format!("Failed to build TLS config: {e}")))?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
                .with_no_client_auth();
            HttpsConnectorBuilder::new().with_tls_config(tls)
        } else {
            HttpsConnectorBuilder::new()
                .with_provider_and_webpki_roots(provider)
                .map_err(|e| GatewayError::Tls(format!("Failed to load webpki roots: {e}")))?
        };

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));

        let connector = builder
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http);

        let mut client = Client::builder(TokioExecutor::new());
        client.pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs));

        Ok(Self {
            inner: client.build(connector),
            skip_tls_verification: config.skip_tls_verification,
        })
    }

    pub fn skips_tls_verification(&self) -> bool {
        self.skip_tls_verification
    }

    pub async fn request(
        &self,
        req: Request<Incoming>,
    ) -> std::result::Result<Response<Incoming>, hyper_util::client::legacy::Error> {
        self.inner.request(req).await
    }
}

/// Accepts any server certificate while still checking handshake signatures.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        crypto::verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        crypto::verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_with_and_without_verification() -> Result<()> {
        let skip = UpstreamClient::new(&UpstreamConfig::default())?;
        assert!(skip.skips_tls_verification());

        let verify = UpstreamClient::new(&UpstreamConfig {
            skip_tls_verification: false,
            ..UpstreamConfig::default()
        })?;
        assert!(!verify.skips_tls_verification());
        Ok(())
    }
}
